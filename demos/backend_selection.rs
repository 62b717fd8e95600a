//! Shows how backend preferences are resolved and why candidates are skipped.

use omnifft::{
    cpu, dft, dht, make_plan_with_feedback, Backend, BackendParameters, Desc, Direction,
    SelectStrategy,
};

fn report(label: &str, desc: Desc, params: &BackendParameters) {
    println!("{label}");
    let (plan, feedback) = make_plan_with_feedback(desc, params);
    for f in &feedback {
        println!("   skipped {}: {}", f.backend, f.message);
    }
    match plan {
        Ok(plan) => println!("   selected {}\n", plan.backend()),
        Err(e) => println!("   failed: {e}\n"),
    }
}

fn main() -> omnifft::Result<()> {
    let c2c = || Desc::new(dft::Parameters::c2c(Direction::Forward, [1024]), cpu::Parameters::default());

    report("Default order", c2c()?, &BackendParameters::default());
    report(
        "Explicit order",
        c2c()?,
        &BackendParameters::ordered([Backend::Fftw3, Backend::VkFft, Backend::Native]),
    );
    report(
        "Cheapest plan",
        c2c()?,
        &BackendParameters::with_strategy(SelectStrategy::Best),
    );
    report(
        "Hartley transform",
        Desc::new(dht::Parameters::new(Direction::Forward, [32, 32]), cpu::Parameters::default())?,
        &BackendParameters::default(),
    );
    report("Nothing allowed", c2c()?, &BackendParameters::only(Backend::Mkl));
    Ok(())
}
