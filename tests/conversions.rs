//! End-to-end conversion properties driven through the kernel layer.

use std::sync::Arc;

use arrow_array::builder::StringBuilder;
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef};
use arrow_schema::Field;
use geoarrow_compute::kernel::{Kernel, KernelOptions};
use geoarrow_compute::schema::{
    CoordType, Dimension, GeoArrowType, GeometryType, WkbType, WktType,
};

fn wkt_field() -> Field {
    GeoArrowType::Wkt(WktType::new(Default::default())).to_field("geometry", true)
}

fn wkb_field() -> Field {
    GeoArrowType::Wkb(WkbType::new(Default::default())).to_field("geometry", true)
}

fn wkt_array(values: &[Option<&str>]) -> ArrayRef {
    let mut builder = StringBuilder::new();
    for value in values {
        match value {
            Some(v) => builder.append_value(v),
            None => builder.append_null(),
        }
    }
    Arc::new(builder.finish())
}

fn run(name: &str, field: &Field, options: &KernelOptions, batch: &ArrayRef) -> ArrayRef {
    let mut kernel = Kernel::start(name, field, options).unwrap();
    kernel.push_batch(batch).unwrap().unwrap()
}

fn geoarrow_options(target: &GeoArrowType) -> KernelOptions {
    let mut options = KernelOptions::new();
    options.set("type", target.type_id().unwrap().to_string());
    options
}

const FIXTURES: &[&str] = &[
    "POINT (30 10)",
    "POINT Z (1 2 3)",
    "POINT ZM (1 2 3 4)",
    "LINESTRING (30 10, 10 30, 40 40)",
    "POLYGON ((30 10, 40 40, 20 40, 10 20, 30 10))",
    "POLYGON ((35 10, 45 45, 15 40, 10 20, 35 10), (20 30, 35 35, 30 20, 20 30))",
    "MULTIPOINT ((10 40), (40 30), (20 20), (30 10))",
    "MULTILINESTRING ((10 10, 20 20, 10 40), (40 40, 30 30, 40 20, 30 10))",
    "MULTIPOLYGON (((30 20, 45 40, 10 40, 30 20)), ((15 5, 40 10, 10 20, 5 10, 15 5)))",
    "GEOMETRYCOLLECTION (POINT (4 6), LINESTRING (4 6, 7 10))",
    "LINESTRING EMPTY",
    "POLYGON EMPTY",
    "MULTIPOINT EMPTY",
];

/// wkt → wkb → wkt preserves geometry identity (the canonical text form is
/// stable after one normalization pass).
#[test]
fn wkt_wkb_wkt_identity() {
    let input = wkt_array(&FIXTURES.iter().map(|s| Some(*s)).collect::<Vec<_>>());

    // Normalize once through format_wkt to get the canonical text.
    let canonical = run("format_wkt", &wkt_field(), &KernelOptions::new(), &input);

    let wkb = run("as_wkb", &wkt_field(), &KernelOptions::new(), &input);
    let back = run("format_wkt", &wkb_field(), &KernelOptions::new(), &wkb);

    let canonical = canonical.as_string::<i32>();
    let back = back.as_string::<i32>();
    for i in 0..canonical.len() {
        assert_eq!(canonical.value(i), back.value(i), "fixture {}", FIXTURES[i]);
    }
}

/// wkb → wkb is byte-stable once the input is little-endian ISO.
#[test]
fn wkb_canonical_form_is_fixed_point() {
    let input = wkt_array(&FIXTURES.iter().map(|s| Some(*s)).collect::<Vec<_>>());
    let wkb1 = run("as_wkb", &wkt_field(), &KernelOptions::new(), &input);

    // Convert the WKB back to WKT and to WKB again.
    let wkt = run("as_wkt", &wkb_field(), &KernelOptions::new(), &wkb1);
    let wkb2 = run("as_wkb", &wkt_field(), &KernelOptions::new(), &wkt);

    let a = wkb1.as_binary::<i32>();
    let b = wkb2.as_binary::<i32>();
    for i in 0..a.len() {
        assert_eq!(a.value(i), b.value(i), "fixture {}", FIXTURES[i]);
    }
}

/// wkt → native → wkt round-trips through every matching native layout.
#[test]
fn native_round_trip_per_type() {
    let cases: &[(&str, GeometryType)] = &[
        ("POINT (30 10)", GeometryType::Point),
        ("LINESTRING (30 10, 10 30, 40 40)", GeometryType::LineString),
        (
            "POLYGON ((30 10, 40 40, 20 40, 10 20, 30 10))",
            GeometryType::Polygon,
        ),
        (
            "MULTIPOINT ((10 40), (40 30))",
            GeometryType::MultiPoint,
        ),
        (
            "MULTILINESTRING ((10 10, 20 20), (40 40, 30 30))",
            GeometryType::MultiLineString,
        ),
        (
            "MULTIPOLYGON (((30 20, 45 40, 10 40, 30 20)))",
            GeometryType::MultiPolygon,
        ),
    ];

    for coord_type in [CoordType::Separated, CoordType::Interleaved] {
        for (wkt, geometry_type) in cases {
            let target = GeoArrowType::new(*geometry_type, Dimension::XY, coord_type).unwrap();
            let input = wkt_array(&[Some(wkt), None]);

            let native = run(
                "as_geoarrow",
                &wkt_field(),
                &geoarrow_options(&target),
                &input,
            );
            assert_eq!(native.len(), 2);
            assert_eq!(native.null_count(), 1);

            let native_field = Field::new("geometry", native.data_type().clone(), true)
                .with_metadata(target.to_field("geometry", true).metadata().clone());
            let back = run("format_wkt", &native_field, &KernelOptions::new(), &native);
            let back = back.as_string::<i32>();
            assert_eq!(back.value(0), *wkt);
            assert!(back.is_null(1));
        }
    }
}

/// as_geoarrow with the input's own type is the identity.
#[test]
fn native_pass_through_is_identity() {
    let target =
        GeoArrowType::new(GeometryType::Point, Dimension::XY, CoordType::Separated).unwrap();
    let input = wkt_array(&[Some("POINT (30 10)")]);
    let native = run(
        "as_geoarrow",
        &wkt_field(),
        &geoarrow_options(&target),
        &input,
    );

    let native_field = target.to_field("geometry", true);
    let mut kernel = Kernel::start("as_geoarrow", &native_field, &geoarrow_options(&target))
        .unwrap();
    let out = kernel.push_batch(&native).unwrap().unwrap();
    assert!(Arc::ptr_eq(&native, &out));
}

/// Arrays produced by conversion pass the validator (builder validation).
#[test]
fn converted_arrays_validate() {
    let target =
        GeoArrowType::new(GeometryType::MultiPolygon, Dimension::XY, CoordType::Separated)
            .unwrap();
    let input = wkt_array(&[
        Some("MULTIPOLYGON (((30 20, 45 40, 10 40, 30 20)))"),
        Some("POLYGON ((0 0, 1 0, 0 1, 0 0))"),
        None,
    ]);
    let native = run(
        "as_geoarrow",
        &wkt_field(),
        &geoarrow_options(&target),
        &input,
    );

    let native_field = target.to_field("geometry", true);
    let mut validator =
        Kernel::start("visit_void_agg", &native_field, &KernelOptions::new()).unwrap();
    assert!(validator.push_batch(&native).unwrap().is_none());
    let out = validator.finish().unwrap().unwrap();
    assert_eq!(out.len(), 1);
}

/// box over any partition equals the componentwise merge of partial boxes.
#[test]
fn aggregate_box_is_partition_independent() {
    use arrow_array::types::Float64Type;

    let features: Vec<Option<&str>> = vec![
        Some("POINT (0 1)"),
        Some("LINESTRING (5 5, -3 7)"),
        None,
        Some("POLYGON ((2 2, 9 2, 9 9, 2 2))"),
        Some("POINT EMPTY"),
    ];

    let whole = {
        let mut kernel = Kernel::start("box_agg", &wkt_field(), &KernelOptions::new()).unwrap();
        kernel.push_batch(&wkt_array(&features)).unwrap();
        kernel.finish().unwrap().unwrap()
    };

    for split in 1..features.len() {
        let split_result = {
            let mut kernel =
                Kernel::start("box_agg", &wkt_field(), &KernelOptions::new()).unwrap();
            kernel.push_batch(&wkt_array(&features[..split])).unwrap();
            kernel.push_batch(&wkt_array(&features[split..])).unwrap();
            kernel.finish().unwrap().unwrap()
        };
        let a = whole.as_struct();
        let b = split_result.as_struct();
        for c in 0..4 {
            assert_eq!(
                a.column(c).as_primitive::<Float64Type>().value(0),
                b.column(c).as_primitive::<Float64Type>().value(0),
                "split at {split}, component {c}"
            );
        }
    }
}

/// Box components bound every coordinate of the feature.
#[test]
fn box_bounds_are_monotone() {
    use arrow_array::types::Float64Type;

    let input = wkt_array(&FIXTURES.iter().map(|s| Some(*s)).collect::<Vec<_>>());
    let boxes = run("box", &wkt_field(), &KernelOptions::new(), &input);
    let s = boxes.as_struct();
    let xmin = s.column(0).as_primitive::<Float64Type>();
    let xmax = s.column(1).as_primitive::<Float64Type>();
    let ymin = s.column(2).as_primitive::<Float64Type>();
    let ymax = s.column(3).as_primitive::<Float64Type>();
    for i in 0..s.len() {
        let empty = xmin.value(i) > xmax.value(i);
        if !empty {
            assert!(xmin.value(i) <= xmax.value(i));
            assert!(ymin.value(i) <= ymax.value(i));
        }
    }
}
