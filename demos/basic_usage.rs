//! Basic usage example for omnifft
//!
//! Builds descriptors for a complex, a real and a cosine transform, lets the
//! library pick a backend for each and runs them.

use omnifft::{
    cpu, dft, dtt, make_plan, BackendParameters, Complex32, Desc, Destination, Direction,
    Normalization, Source,
};

fn main() -> omnifft::Result<()> {
    println!("=== omnifft Basic Usage Example ===\n");

    // 1. Complex forward transform
    println!("1. Complex DFT");
    let desc = Desc::new(dft::Parameters::c2c(Direction::Forward, [4]), cpu::Parameters::default())?;
    let mut plan = make_plan(desc, &BackendParameters::default())?;
    println!("   Backend: {}", plan.backend());

    let input: Vec<Complex32> = [1.0, 2.0, 3.0, 4.0]
        .iter()
        .map(|&re| Complex32::new(re, 0.0))
        .collect();
    let mut spectrum = vec![Complex32::default(); 4];
    plan.execute(Source::slice(&input), Destination::slice_mut(&mut spectrum), cpu::ExecutionParameters)?;
    println!(
        "   Spectrum: {:?}",
        spectrum.iter().map(|c| format!("{:.2}+{:.2}i", c.re, c.im)).collect::<Vec<_>>()
    );

    // The same plan transforms a buffer in place
    let mut in_place = input.clone();
    plan.execute_in_place(Destination::slice_mut(&mut in_place), cpu::ExecutionParameters)?;
    println!("   In place matches: {}", in_place == spectrum);

    // 2. Real round trip over two axes
    println!("\n2. Real DFT round trip");
    let shape = [4, 6];
    let signal: Vec<f32> = (0..24).map(|i| (i as f32 * 0.4).sin()).collect();
    let mut half = vec![Complex32::default(); 4 * (6 / 2 + 1)];
    let mut back = vec![0.0f32; 24];

    let r2c = Desc::new(dft::Parameters::r2c(shape), cpu::Parameters::default())?;
    let c2r = Desc::new(
        dft::Parameters::c2r(shape).with_normalization(Normalization::Unitary),
        cpu::Parameters::default(),
    )?;
    make_plan(r2c, &BackendParameters::default())?.execute(
        Source::slice(&signal),
        Destination::slice_mut(&mut half),
        cpu::ExecutionParameters,
    )?;
    make_plan(c2r, &BackendParameters::default())?.execute(
        Source::slice(&half),
        Destination::slice_mut(&mut back),
        cpu::ExecutionParameters,
    )?;
    let err = signal
        .iter()
        .zip(&back)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    println!("   Max round trip error: {err:.2e}");

    // 3. Cosine transform
    println!("\n3. DCT-II");
    let desc = Desc::new(
        dtt::Parameters::new(Direction::Forward, dtt::Type::Dct2, [8]),
        cpu::Parameters::default(),
    )?;
    let mut plan = make_plan(desc, &BackendParameters::default())?;
    let ramp: Vec<f32> = (0..8).map(|i| i as f32).collect();
    let mut coeffs = vec![0.0f32; 8];
    plan.execute(Source::slice(&ramp), Destination::slice_mut(&mut coeffs), cpu::ExecutionParameters)?;
    println!("   Coefficients: {:?}", coeffs.iter().map(|c| format!("{c:.2}")).collect::<Vec<_>>());

    Ok(())
}
