//! Demonstrates enabling verbose logging for omnifft.
use omnifft::{cpu, dft, make_plan, BackendParameters, Complex32, Desc, Destination, Direction, Source};

fn main() -> omnifft::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let desc = Desc::new(dft::Parameters::c2c(Direction::Forward, [12, 5]), cpu::Parameters::default())?;
    let mut plan = make_plan(desc, &BackendParameters::default())?;
    let input = vec![Complex32::new(1.0, 0.0); 60];
    let mut output = vec![Complex32::default(); 60];
    plan.execute(Source::slice(&input), Destination::slice_mut(&mut output), cpu::ExecutionParameters)
}
