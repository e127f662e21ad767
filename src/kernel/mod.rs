//! Named, stateful stream operators over GeoArrow arrays.
//!
//! A kernel is created by name with [`Kernel::start`], which validates the
//! input type and options, resolves the output field, and allocates state.
//! Element-wise kernels transform each pushed batch into an output batch of
//! the same length and carry no state across batches; aggregate kernels
//! accumulate across batches and emit a single length-1 array from
//! [`Kernel::finish`].
//!
//! A kernel instance is single-threaded: drive it from one caller at a time
//! and construct independent instances for parallelism. Any error during a
//! push leaves the batch unapplied and moves the kernel into a terminal
//! error state that rejects further calls.

pub(crate) mod bbox;
mod options;

use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, Int32Array, NullArray, StructArray};
use arrow_schema::{DataType, Field, FieldRef};
use indexmap::IndexSet;

use crate::array::GeometryArrayView;
use crate::builder::NativeBuilder;
use crate::error::{GeoArrowError, Result};
use crate::kernel::bbox::{
    accumulate_batch, box_result_data_type, box_result_fields, BoxVisitor,
};
use crate::schema::type_id::iso_code;
use crate::schema::{Dimension, GeoArrowType, GeometryType, WkbType, WktType};
use crate::visitor::GeomVisitor;
use crate::wkb::WkbBuilder;
use crate::wkt::{WktBuilder, WktOptions};

pub use bbox::BoundingRect;
pub use options::KernelOptions;

/// The closed set of kernel names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Element-wise; emits a null array of the input length.
    Void,
    /// Aggregate; emits a length-1 null array.
    VoidAgg,
    /// Aggregate validator; walks every feature and emits a length-1 null
    /// array, surfacing the first structural or parse error.
    VisitVoidAgg,
    /// Element-wise conversion to WKT storage.
    AsWkt,
    /// Element-wise conversion to WKB storage.
    AsWkb,
    /// Element-wise conversion to a native layout given by the `type` option.
    AsGeoArrow,
    /// Element-wise formatting to plain utf8 (not extension-tagged).
    FormatWkt,
    /// Aggregate; emits the distinct packed ISO type codes seen.
    UniqueGeometryTypesAgg,
    /// Element-wise planar bounding box per feature.
    BoxKernel,
    /// Aggregate planar bounding box.
    BoxAgg,
}

impl KernelKind {
    /// Resolve a kernel name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "void" => Ok(Self::Void),
            "void_agg" => Ok(Self::VoidAgg),
            "visit_void_agg" => Ok(Self::VisitVoidAgg),
            "as_wkt" => Ok(Self::AsWkt),
            "as_wkb" => Ok(Self::AsWkb),
            "as_geoarrow" => Ok(Self::AsGeoArrow),
            "format_wkt" => Ok(Self::FormatWkt),
            "unique_geometry_types_agg" => Ok(Self::UniqueGeometryTypesAgg),
            "box" => Ok(Self::BoxKernel),
            "box_agg" => Ok(Self::BoxAgg),
            name => Err(GeoArrowError::IllegalArgument(format!(
                "Unknown kernel name: {name}"
            ))),
        }
    }

    /// The kernel's registered name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::VoidAgg => "void_agg",
            Self::VisitVoidAgg => "visit_void_agg",
            Self::AsWkt => "as_wkt",
            Self::AsWkb => "as_wkb",
            Self::AsGeoArrow => "as_geoarrow",
            Self::FormatWkt => "format_wkt",
            Self::UniqueGeometryTypesAgg => "unique_geometry_types_agg",
            Self::BoxKernel => "box",
            Self::BoxAgg => "box_agg",
        }
    }

    /// Whether this kernel aggregates across batches.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Self::VoidAgg | Self::VisitVoidAgg | Self::UniqueGeometryTypesAgg | Self::BoxAgg
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Ready,
    Finished,
    Errored,
}

#[derive(Debug)]
enum Inner {
    Void,
    VoidAgg,
    VisitVoidAgg,
    Convert { target: GeoArrowType },
    FormatWkt { options: WktOptions },
    UniqueTypes { codes: IndexSet<i32> },
    BoxKernel,
    BoxAgg { rect: BoundingRect },
}

/// A started kernel instance.
#[derive(Debug)]
pub struct Kernel {
    kind: KernelKind,
    input_type: GeoArrowType,
    output_field: FieldRef,
    state: State,
    inner: Inner,
}

impl Kernel {
    /// Start a kernel by name against an input field.
    ///
    /// Validates the input descriptor and options and resolves the output
    /// field. Fails with `IllegalArgument` for unknown names, unknown or
    /// malformed options, or a non-GeoArrow input field, and with
    /// `IncompatibleType` when the operation cannot apply to the input's
    /// edge type.
    pub fn start(name: &str, input_field: &Field, options: &KernelOptions) -> Result<Self> {
        let kind = KernelKind::from_name(name)?;
        let input_type = GeoArrowType::from_extension_field(input_field)?;

        let (output_field, inner) = match kind {
            KernelKind::Void | KernelKind::VoidAgg | KernelKind::VisitVoidAgg => {
                options.expect_keys(&[])?;
                let inner = match kind {
                    KernelKind::Void => Inner::Void,
                    KernelKind::VoidAgg => Inner::VoidAgg,
                    _ => Inner::VisitVoidAgg,
                };
                (Field::new("", DataType::Null, true), inner)
            }
            KernelKind::AsWkt => {
                options.expect_keys(&[])?;
                let target = match &input_type {
                    GeoArrowType::Wkt(t) => GeoArrowType::Wkt(t.clone()),
                    GeoArrowType::LargeWkt(t) => GeoArrowType::LargeWkt(t.clone()),
                    other => {
                        GeoArrowType::Wkt(WktType::new(other.metadata().clone()))
                    }
                };
                (target.to_field("geometry", true), Inner::Convert { target })
            }
            KernelKind::AsWkb => {
                options.expect_keys(&[])?;
                let target = match &input_type {
                    GeoArrowType::Wkb(t) => GeoArrowType::Wkb(t.clone()),
                    GeoArrowType::LargeWkb(t) => GeoArrowType::LargeWkb(t.clone()),
                    other => {
                        GeoArrowType::Wkb(WkbType::new(other.metadata().clone()))
                    }
                };
                (target.to_field("geometry", true), Inner::Convert { target })
            }
            KernelKind::AsGeoArrow => {
                options.expect_keys(&["type"])?;
                let id = options.get_i64("type")?.ok_or_else(|| {
                    GeoArrowError::IllegalArgument(
                        "as_geoarrow requires the type option".to_string(),
                    )
                })?;
                let id = i32::try_from(id).map_err(|_| {
                    GeoArrowError::IllegalArgument(format!("Invalid type id: {id}"))
                })?;
                let target =
                    GeoArrowType::from_type_id(id)?.with_metadata(input_type.metadata().clone());
                (target.to_field("geometry", true), Inner::Convert { target })
            }
            KernelKind::FormatWkt => {
                options.expect_keys(&["significant_digits", "max_element_size_bytes"])?;
                let significant_digits = match options.get_i64("significant_digits")? {
                    None => None,
                    Some(digits) if (0..=17).contains(&digits) => Some(digits as usize),
                    Some(digits) => {
                        return Err(GeoArrowError::IllegalArgument(format!(
                            "significant_digits must be between 0 and 17, got {digits}"
                        )))
                    }
                };
                let max_element_size_bytes = match options.get_i64("max_element_size_bytes")? {
                    None => None,
                    Some(bytes) if bytes >= 0 => Some(bytes as usize),
                    Some(bytes) => {
                        return Err(GeoArrowError::IllegalArgument(format!(
                            "max_element_size_bytes must be non-negative, got {bytes}"
                        )))
                    }
                };
                let wkt_options = WktOptions {
                    significant_digits,
                    max_element_size_bytes,
                };
                (
                    Field::new("", DataType::Utf8, true),
                    Inner::FormatWkt {
                        options: wkt_options,
                    },
                )
            }
            KernelKind::UniqueGeometryTypesAgg => {
                options.expect_keys(&[])?;
                (
                    Field::new("", DataType::Int32, false),
                    Inner::UniqueTypes {
                        codes: IndexSet::new(),
                    },
                )
            }
            KernelKind::BoxKernel | KernelKind::BoxAgg => {
                options.expect_keys(&[])?;
                if !input_type.metadata().is_planar() {
                    return Err(GeoArrowError::IncompatibleType(format!(
                        "Bounding boxes of {:?} edges require non-planar interpolation",
                        input_type.metadata().edges().unwrap()
                    )));
                }
                let inner = match kind {
                    KernelKind::BoxKernel => Inner::BoxKernel,
                    _ => Inner::BoxAgg {
                        rect: BoundingRect::new(),
                    },
                };
                (Field::new("", box_result_data_type(), true), inner)
            }
        };

        Ok(Self {
            kind,
            input_type,
            output_field: Arc::new(output_field),
            state: State::Ready,
            inner,
        })
    }

    /// The kernel's kind.
    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    /// The input descriptor the kernel was started with.
    pub fn input_type(&self) -> &GeoArrowType {
        &self.input_type
    }

    /// The resolved output field.
    pub fn output_field(&self) -> FieldRef {
        self.output_field.clone()
    }

    /// Whether this kernel aggregates across batches.
    pub fn is_aggregate(&self) -> bool {
        self.kind.is_aggregate()
    }

    fn check_ready(&self) -> Result<()> {
        match self.state {
            State::Ready => Ok(()),
            State::Finished => Err(GeoArrowError::IllegalArgument(
                "Kernel is already finished".to_string(),
            )),
            State::Errored => Err(GeoArrowError::IllegalArgument(
                "Kernel is in a terminal error state".to_string(),
            )),
        }
    }

    /// Push one batch.
    ///
    /// Element-wise kernels return the transformed batch; aggregate kernels
    /// accumulate and return `None`. On error the batch is not applied and
    /// the kernel becomes terminal.
    pub fn push_batch(&mut self, array: &ArrayRef) -> Result<Option<ArrayRef>> {
        self.check_ready()?;
        match self.push_batch_inner(array) {
            Ok(out) => Ok(out),
            Err(err) => {
                self.state = State::Errored;
                Err(err)
            }
        }
    }

    fn push_batch_inner(&mut self, array: &ArrayRef) -> Result<Option<ArrayRef>> {
        let view = GeometryArrayView::try_new(array.as_ref(), self.input_type.clone())?;
        match &mut self.inner {
            Inner::Void => Ok(Some(Arc::new(NullArray::new(array.len())) as ArrayRef)),
            Inner::VoidAgg => Ok(None),
            Inner::VisitVoidAgg => {
                let mut validator = ValidateVisitor::default();
                view.visit(&mut validator)?;
                Ok(None)
            }
            Inner::Convert { target } => {
                // Pass-through when the input already has the target type.
                if *target == self.input_type {
                    return Ok(Some(array.clone()));
                }
                Ok(Some(convert(&view, target)?))
            }
            Inner::FormatWkt { options } => {
                let mut writer = WktBuilder::<i32>::with_options(*options);
                view.visit(&mut writer)?;
                Ok(Some(writer.finish()))
            }
            Inner::UniqueTypes { codes } => {
                // Accumulate into a scratch set so a failing batch leaves no
                // partial state behind.
                let mut visitor = TypesVisitor::default();
                view.visit(&mut visitor)?;
                codes.extend(visitor.codes);
                Ok(None)
            }
            Inner::BoxKernel => {
                let mut visitor = BoxVisitor::with_capacity(array.len());
                view.visit(&mut visitor)?;
                Ok(Some(visitor.finish()))
            }
            Inner::BoxAgg { rect } => {
                let mut scratch = *rect;
                accumulate_batch(&view, &mut scratch)?;
                *rect = scratch;
                Ok(None)
            }
        }
    }

    /// Finish the kernel.
    ///
    /// Aggregate kernels emit their length-1 result; element-wise kernels
    /// return `None`. The kernel is terminal afterwards.
    pub fn finish(&mut self) -> Result<Option<ArrayRef>> {
        self.check_ready()?;
        self.state = State::Finished;
        let out: Option<ArrayRef> = match &self.inner {
            Inner::VoidAgg | Inner::VisitVoidAgg => Some(Arc::new(NullArray::new(1))),
            Inner::UniqueTypes { codes } => {
                Some(Arc::new(Int32Array::from_iter_values(codes.iter().copied())))
            }
            Inner::BoxAgg { rect } => {
                let columns: Vec<ArrayRef> = [rect.xmin(), rect.xmax(), rect.ymin(), rect.ymax()]
                    .into_iter()
                    .map(|value| Arc::new(Float64Array::from(vec![value])) as ArrayRef)
                    .collect();
                Some(Arc::new(StructArray::new(
                    box_result_fields(),
                    columns,
                    None,
                )))
            }
            Inner::Void
            | Inner::Convert { .. }
            | Inner::FormatWkt { .. }
            | Inner::BoxKernel => None,
        };
        Ok(out)
    }
}

fn convert(view: &GeometryArrayView, target: &GeoArrowType) -> Result<ArrayRef> {
    match target {
        GeoArrowType::Wkt(_) => {
            let mut writer = WktBuilder::<i32>::new();
            view.visit(&mut writer)?;
            Ok(writer.finish())
        }
        GeoArrowType::LargeWkt(_) => {
            let mut writer = WktBuilder::<i64>::new();
            view.visit(&mut writer)?;
            Ok(writer.finish())
        }
        GeoArrowType::Wkb(_) => {
            let mut writer = WkbBuilder::<i32>::new();
            view.visit(&mut writer)?;
            Ok(writer.finish())
        }
        GeoArrowType::LargeWkb(_) => {
            let mut writer = WkbBuilder::<i64>::new();
            view.visit(&mut writer)?;
            Ok(writer.finish())
        }
        native => {
            let mut builder = NativeBuilder::new(native)?;
            view.visit(&mut builder)?;
            builder.finish()
        }
    }
}

/// Walks every feature, checking event balance without emitting anything.
#[derive(Debug, Default)]
struct ValidateVisitor {
    depth: usize,
    in_ring: bool,
}

impl GeomVisitor for ValidateVisitor {
    fn feature_begin(&mut self) -> Result<()> {
        self.depth = 0;
        self.in_ring = false;
        Ok(())
    }

    fn geometry_begin(&mut self, _geometry_type: GeometryType, _dim: Dimension) -> Result<()> {
        if self.in_ring {
            return Err(GeoArrowError::Validation(
                "Geometry nested inside a ring".to_string(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(GeoArrowError::Validation(
                "Unbalanced geometry_end".to_string(),
            ));
        }
        self.depth -= 1;
        Ok(())
    }

    fn ring_begin(&mut self) -> Result<()> {
        if self.depth == 0 || self.in_ring {
            return Err(GeoArrowError::Validation(
                "Ring outside a geometry".to_string(),
            ));
        }
        self.in_ring = true;
        Ok(())
    }

    fn ring_end(&mut self) -> Result<()> {
        if !self.in_ring {
            return Err(GeoArrowError::Validation("Unbalanced ring_end".to_string()));
        }
        self.in_ring = false;
        Ok(())
    }

    fn coord(&mut self, _x: f64, _y: f64, _z: Option<f64>, _m: Option<f64>) -> Result<()> {
        if self.depth == 0 {
            return Err(GeoArrowError::Validation(
                "Coordinate outside a geometry".to_string(),
            ));
        }
        Ok(())
    }

    fn feature_end(&mut self) -> Result<()> {
        if self.depth != 0 || self.in_ring {
            return Err(GeoArrowError::Validation(
                "Unbalanced feature_end".to_string(),
            ));
        }
        Ok(())
    }
}

/// Records the packed ISO type code of each feature's outermost geometry.
#[derive(Debug, Default)]
struct TypesVisitor {
    depth: usize,
    codes: IndexSet<i32>,
}

impl GeomVisitor for TypesVisitor {
    fn feature_begin(&mut self) -> Result<()> {
        self.depth = 0;
        Ok(())
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, dim: Dimension) -> Result<()> {
        if self.depth == 0 {
            self.codes.insert(iso_code(geometry_type, dim));
        }
        self.depth += 1;
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }
}
