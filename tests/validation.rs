// Test intent: descriptor construction rejects every malformed parameter
// with the specific reason, and fills in default strides.

use omnifft::{
    cpu, dft, dht, dtt, spmt, validate, Axes, Desc, Dimensions, Direction, Error, InvalidArgument,
    Normalization, Placement, Precision, RawEnum, Side,
};

fn cpu() -> cpu::Parameters {
    cpu::Parameters::default()
}

fn invalid(cause: InvalidArgument) -> Error {
    Error::InvalidArgument(cause)
}

/// Raw enumeration values outside the known set are rejected by name
#[test]
fn raw_values_are_checked() {
    assert_eq!(validate::validate_raw::<Direction>(1), Ok(Direction::Inverse));
    assert_eq!(
        validate::validate_raw::<Precision>(42),
        Err(invalid(InvalidArgument::InvalidValue {
            what: "precision",
            raw: 42
        }))
    );
    assert!(validate::is_valid_raw::<dtt::Type>(7));
    assert!(!validate::is_valid_raw::<dtt::Type>(8));
    assert_eq!(Precision::from_raw(3), Some(Precision::F64));
}

/// A list of raw values reports the index of the first bad entry
#[test]
fn raw_lists_report_the_bad_index() {
    assert_eq!(
        validate::validate_raw_all::<dtt::Type>(&[0, 1, 9, 2]),
        Err(invalid(InvalidArgument::InvalidElement {
            what: "dtt type",
            index: 2
        }))
    );
}

/// Default strides are row-major over the shape
#[test]
fn default_strides_are_row_major() {
    let desc = Desc::new(dft::Parameters::c2c(Direction::Forward, [4, 8, 16]), cpu()).unwrap();
    assert_eq!(desc.src_strides(), &[128, 16, 1]);
    assert_eq!(desc.dst_strides(), &[128, 16, 1]);
    assert_eq!(desc.transform_axes(), &[0, 1, 2]);
}

/// Shape problems are found before stride problems
#[test]
fn shape_and_stride_errors() {
    let mut params = dft::Parameters::c2c(Direction::Forward, [4, 4]);
    params.dimensions = Dimensions::new(Vec::<usize>::new());
    params.axes = Axes::from([0]);
    assert_eq!(
        Desc::new(params.clone(), cpu()).unwrap_err(),
        invalid(InvalidArgument::AxesExceedRank { count: 1, rank: 0 })
    );

    params.dimensions = Dimensions::new([2, 2, 2, 2, 2]);
    assert_eq!(
        Desc::new(params.clone(), cpu()).unwrap_err(),
        invalid(InvalidArgument::TooManyDimensions(5))
    );

    params.dimensions = Dimensions::new([4, 4]).with_strides([4, 1], [0, 1]);
    assert_eq!(
        Desc::new(params.clone(), cpu()).unwrap_err(),
        invalid(InvalidArgument::ZeroStride {
            side: Side::Destination,
            index: 0
        })
    );

    params.dimensions = Dimensions::new([4, 4]).with_strides([1], Vec::<usize>::new());
    assert_eq!(
        Desc::new(params, cpu()).unwrap_err(),
        invalid(InvalidArgument::StrideCount {
            side: Side::Source,
            expected: 2,
            actual: 1
        })
    );
}

/// Axes beyond the transform limit are rejected before the rank check
#[test]
fn axis_limits() {
    let params = dft::Parameters::c2c(Direction::Forward, [2, 2, 2, 2]).with_axes(Axes::from([3, 1]));
    assert!(Desc::new(params, cpu()).is_ok());

    let params = dft::Parameters::c2c(Direction::Forward, [2, 2]).with_axes(Axes::from([0, 2]));
    assert_eq!(
        Desc::new(params, cpu()).unwrap_err(),
        invalid(InvalidArgument::AxisOutOfRange { axis: 2, rank: 2 })
    );

    let params = dft::Parameters::c2c(Direction::Forward, [2, 2]).with_axes(Axes::List(vec![]));
    assert_eq!(Desc::new(params, cpu()).unwrap_err(), invalid(InvalidArgument::EmptyAxes));
}

/// Hermitian sources may only pair with real destinations
#[test]
fn format_pairs() {
    let ok = dft::Parameters::c2r([8]);
    assert!(Desc::new(ok, cpu()).is_ok());

    let bad = dft::Parameters::c2c(Direction::Forward, [8])
        .with_formats(dft::Format::HermitianComplexPlanar, dft::Format::ComplexInterleaved);
    assert_eq!(
        Desc::new(bad, cpu()).unwrap_err(),
        invalid(InvalidArgument::IncompatibleFormats {
            src: dft::Format::HermitianComplexPlanar,
            dst: dft::Format::ComplexInterleaved
        })
    );
}

/// DTT types must be one per axis or a single broadcast type
#[test]
fn dtt_type_count() {
    let mut params = dtt::Parameters::new(Direction::Forward, dtt::Type::Dct2, [4, 4, 4]);
    params.types = vec![dtt::Type::Dct2, dtt::Type::Dst2];
    assert_eq!(
        Desc::new(params, cpu()).unwrap_err(),
        invalid(InvalidArgument::DttTypeCount {
            expected: 3,
            actual: 2
        })
    );
    assert_eq!(
        InvalidArgument::DttTypeCount {
            expected: 3,
            actual: 2
        }
        .to_string(),
        "invalid dtt transform types: got 2, expected 1 or 3"
    );
}

/// DCT-I needs two points on every axis it runs along
#[test]
fn dct1_axes_need_two_points() {
    let mut params = dtt::Parameters::new(Direction::Forward, dtt::Type::Dct1, [1]);
    params.normalization = Normalization::Unitary;
    assert_eq!(
        Desc::new(params, cpu()).unwrap_err(),
        invalid(InvalidArgument::DctOneTooShort { axis: 0 })
    );

    let mut mixed = dtt::Parameters::new(Direction::Forward, dtt::Type::Dct2, [4, 1]);
    mixed.types = vec![dtt::Type::Dct2, dtt::Type::Dct1];
    assert_eq!(
        Desc::new(mixed.clone(), cpu()).unwrap_err(),
        invalid(InvalidArgument::DctOneTooShort { axis: 1 })
    );

    mixed.types = vec![dtt::Type::Dct1, dtt::Type::Dst1];
    mixed.normalization = Normalization::Unitary;
    let desc = Desc::new(mixed, cpu()).unwrap();
    // 2 * (4 - 1) for DCT-I, 2 * (1 + 1) for DST-I
    assert!((desc.norm_factor_f64() - 1.0 / 24.0).abs() < 1e-15);
}

/// An alignment that is not a power of two is rejected
#[test]
fn cpu_alignment() {
    let arch = cpu::Parameters {
        alignment: omnifft::Alignment(48),
        ..cpu()
    };
    assert_eq!(
        Desc::new(dht::Parameters::new(Direction::Forward, [8]), arch).unwrap_err(),
        invalid(InvalidArgument::InvalidAlignment(48))
    );
}

/// Without a GPU runtime no device id can be validated
#[test]
fn gpu_descriptors_need_a_runtime() {
    let arch = spmt::gpu::Parameters::with_devices([0, 1]);
    let err = Desc::with_gpu_runtime(dft::Parameters::c2c(Direction::Forward, [16]), arch, None).unwrap_err();
    assert!(matches!(err, Error::Runtime(_)), "{err}");
    assert!(!err.is_invalid_argument());
}

/// In-place real transforms pad the real side to whole complex elements
#[test]
fn in_place_real_padding() {
    let desc = Desc::new(
        dft::Parameters::c2r([3, 6]).with_placement(Placement::InPlace),
        cpu(),
    )
    .unwrap();
    assert_eq!(desc.src_strides(), &[4, 1]);
    assert_eq!(desc.dst_strides(), &[8, 1]);
    assert_eq!(desc.logical_shape(Side::Source), vec![3, 4]);
}
