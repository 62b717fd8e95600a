// Test intent: plan execution runs its argument checks in order and never
// reaches the backend when one fails; backend selection falls back past
// declining candidates.

use core::ffi::c_void;
use core::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use omnifft::{
    cpu, dft, gpu_arch, spmt, Backend, BackendModule, BackendParameters, BufferPtr, Complex32,
    Desc, Destination, Direction, Distribution, Error, ExecutionParameters, Feedback, GpuRuntime,
    GpuStatus, InvalidArgument, Placement, PlanImpl, Registry, Result, Side, Source, Target,
    TypeProps,
};

/// What the backend hooks saw.
#[derive(Default)]
struct Calls {
    count: AtomicUsize,
    /// Plan placement and whether the first source and destination alias.
    seen: Mutex<Vec<(Placement, bool)>>,
}

impl Calls {
    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn record(&self, desc: &Desc, src: &[BufferPtr], dst: &[BufferPtr]) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((desc.placement(), src[0] == dst[0]));
    }

    fn seen(&self) -> Vec<(Placement, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

/// Accepts every descriptor and records each hook call.
struct Recording {
    backend: Backend,
    calls: Arc<Calls>,
}

impl PlanImpl for Recording {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn execute_cpu_spst(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        _params: &cpu::ExecutionParameters,
    ) -> Result<()> {
        self.calls.record(desc, src, dst);
        Ok(())
    }

    fn execute_gpu_spmt(
        &mut self,
        desc: &Desc,
        src: &[BufferPtr],
        dst: &[BufferPtr],
        _params: &spmt::gpu::ExecutionParameters,
    ) -> Result<()> {
        assert_eq!(src.len(), desc.target_count());
        assert_eq!(dst.len(), desc.target_count());
        self.calls.record(desc, src, dst);
        Ok(())
    }
}

struct Module {
    backend: Backend,
    decline: Option<&'static str>,
    calls: Arc<Calls>,
}

impl Module {
    fn accepting(backend: Backend) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let module = Self {
            backend,
            decline: None,
            calls: calls.clone(),
        };
        (module, calls)
    }

    fn declining(backend: Backend, reason: &'static str) -> Self {
        Self {
            backend,
            decline: Some(reason),
            calls: Arc::default(),
        }
    }
}

impl BackendModule for Module {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn make_plan_impl(&self, _desc: &Desc) -> Result<Box<dyn PlanImpl>> {
        match self.decline {
            Some(reason) => Err(Error::backend(self.backend, reason)),
            None => Ok(Box::new(Recording {
                backend: self.backend,
                calls: self.calls.clone(),
            })),
        }
    }
}

struct FourDevices;

impl GpuRuntime for FourDevices {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn current_device(&self) -> core::result::Result<i32, GpuStatus> {
        Ok(0)
    }

    fn is_valid_device(&self, device: i32) -> bool {
        (0..4).contains(&device)
    }

    fn alloc_unified(&self, _size: usize) -> core::result::Result<NonNull<c_void>, GpuStatus> {
        Err(GpuStatus::failure(1, "not supported"))
    }

    unsafe fn free_unified(&self, _ptr: NonNull<c_void>) -> GpuStatus {
        GpuStatus::success()
    }
}

fn cpu_plan(params: dft::Parameters, arch: cpu::Parameters) -> (omnifft::Plan, Arc<Calls>) {
    let (module, calls) = Module::accepting(Backend::PocketFft);
    let mut registry = Registry::empty();
    registry.register(module);
    let desc = Desc::with_gpu_runtime(params, arch, None).unwrap();
    let plan = registry.make_plan(desc, &BackendParameters::default()).unwrap();
    (plan, calls)
}

fn invalid(cause: InvalidArgument) -> Result<()> {
    Err(Error::InvalidArgument(cause))
}

/// A declining backend is skipped and the next candidate in preference order is used
#[test]
fn falls_back_to_the_next_candidate() {
    let (pocket, _) = Module::accepting(Backend::PocketFft);
    let mut registry = Registry::empty();
    registry
        .register(Module::declining(Backend::Fftw3, "no wisdom for this size"))
        .register(pocket);
    let desc = Desc::with_gpu_runtime(
        dft::Parameters::c2c(Direction::Forward, [16]),
        cpu::Parameters::default(),
        None,
    )
    .unwrap();
    let (plan, feedback) = registry.make_plan_with_feedback(desc, &BackendParameters::default());
    assert_eq!(plan.unwrap().backend(), Backend::PocketFft);
    assert_eq!(
        feedback,
        vec![
            Feedback::new(Backend::Mkl, "backend is disabled"),
            Feedback::new(Backend::Fftw3, "[FFTW3 error] no wisdom for this size"),
            Feedback::new(Backend::RustFft, "backend is disabled"),
        ]
    );
}

/// When every candidate declines, the error lists each reason
#[test]
fn all_declining_is_an_error() {
    let mut registry = Registry::empty();
    registry.register(Module::declining(Backend::Native, "unsupported"));
    let desc = Desc::with_gpu_runtime(
        dft::Parameters::c2c(Direction::Forward, [16]),
        cpu::Parameters::default(),
        None,
    )
    .unwrap();
    let err = registry
        .make_plan(desc, &BackendParameters::only(Backend::Native))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to create plan implementation; native: [native error] unsupported"
    );
}

/// Out-of-place plans reject aliased buffers and in-place plans reject distinct ones
#[test]
fn placement_must_match() {
    let (mut plan, calls) = cpu_plan(dft::Parameters::c2c(Direction::Forward, [8]), cpu::Parameters::default());
    let mut buf = vec![Complex32::default(); 8];
    assert_eq!(
        plan.execute_in_place(Destination::slice_mut(&mut buf), cpu::ExecutionParameters),
        invalid(InvalidArgument::PlacementMismatch {
            expected: Placement::OutOfPlace,
            actual: Placement::InPlace
        })
    );
    assert_eq!(calls.count(), 0);

    let (mut plan, calls) = cpu_plan(
        dft::Parameters::c2c(Direction::Forward, [8]).with_placement(Placement::InPlace),
        cpu::Parameters::default(),
    );
    let src = vec![Complex32::default(); 8];
    assert_eq!(
        plan.execute(Source::slice(&src), Destination::slice_mut(&mut buf), cpu::ExecutionParameters),
        invalid(InvalidArgument::PlacementMismatch {
            expected: Placement::InPlace,
            actual: Placement::OutOfPlace
        })
    );
    plan.execute_in_place(Destination::slice_mut(&mut buf), cpu::ExecutionParameters)
        .unwrap();
    assert_eq!(calls.seen(), vec![(Placement::InPlace, true)]);
}

/// An in-place call may not pass a source typed differently from the plan
#[test]
fn in_place_source_type_is_checked() {
    let (mut plan, calls) = cpu_plan(
        dft::Parameters::c2c(Direction::Forward, [8]).with_placement(Placement::InPlace),
        cpu::Parameters::default(),
    );
    let mut buf = vec![Complex32::default(); 8];
    let addr = buf.as_mut_ptr().cast::<c_void>();
    // SAFETY: the mistyped source is rejected before anything is read.
    let src = unsafe {
        Source::from_raw_typed(
            vec![BufferPtr::Interleaved(addr)],
            TypeProps::of::<omnifft::Complex64>(),
        )
    };
    assert_eq!(
        plan.execute(src, Destination::slice_mut(&mut buf), cpu::ExecutionParameters),
        invalid(InvalidArgument::TypeMismatch {
            side: Side::Source,
            actual: TypeProps::of::<omnifft::Complex64>()
        })
    );
    assert_eq!(calls.count(), 0);
}

/// Buffer pairs must all alias or all be disjoint
#[test]
fn partially_aliased_buffers_are_rejected() {
    let (mut plan, calls) = spmt_plan(false);
    let mut a = vec![Complex32::default(); 16];
    let mut b = vec![Complex32::default(); 16];
    let mut c = vec![Complex32::default(); 16];
    let (pa, pb, pc) = (
        a.as_mut_ptr().cast::<c_void>(),
        b.as_mut_ptr().cast::<c_void>(),
        c.as_mut_ptr().cast::<c_void>(),
    );
    // SAFETY: every call below fails its placement check before any access.
    let mixed = unsafe {
        (
            Source::from_raw(vec![BufferPtr::Interleaved(pa), BufferPtr::Interleaved(pb)]),
            Destination::from_raw(vec![BufferPtr::Interleaved(pa), BufferPtr::Interleaved(pc)]),
        )
    };
    assert_eq!(
        plan.execute(mixed.0, mixed.1, spmt::gpu::ExecutionParameters::default()),
        invalid(InvalidArgument::MixedPlacement)
    );

    let (mut planar, planar_calls) = cpu_plan(
        dft::Parameters::c2c(Direction::Forward, [8])
            .with_formats(dft::Format::ComplexPlanar, dft::Format::ComplexPlanar),
        cpu::Parameters::default(),
    );
    // SAFETY: as above.
    let half_shared = unsafe {
        (
            Source::from_raw(vec![BufferPtr::Planar { real: pa, imag: pb }]),
            Destination::from_raw(vec![BufferPtr::Planar { real: pa, imag: pc }]),
        )
    };
    assert_eq!(
        planar.execute(half_shared.0, half_shared.1, cpu::ExecutionParameters),
        invalid(InvalidArgument::PartialOverlap { index: 0 })
    );
    assert_eq!(calls.count() + planar_calls.count(), 0);
}

/// A plan allowed to overwrite its input refuses a read-only source
#[test]
fn destructive_plans_need_a_mutable_source() {
    let arch = cpu::Parameters {
        preserve_source: false,
        ..Default::default()
    };
    let (mut plan, calls) = cpu_plan(dft::Parameters::c2c(Direction::Forward, [8]), arch);
    let mut src = vec![Complex32::default(); 8];
    let mut dst = vec![Complex32::default(); 8];
    assert_eq!(
        plan.execute(Source::slice(&src), Destination::slice_mut(&mut dst), cpu::ExecutionParameters),
        invalid(InvalidArgument::SourceNotPreserved)
    );
    plan.execute(Source::slice_mut(&mut src), Destination::slice_mut(&mut dst), cpu::ExecutionParameters)
        .unwrap();
    assert_eq!(calls.seen(), vec![(Placement::OutOfPlace, false)]);
}

/// Null raw addresses are reported with their side and index
#[test]
fn null_buffers_are_rejected() {
    let (mut plan, calls) = cpu_plan(dft::Parameters::c2c(Direction::Forward, [8]), cpu::Parameters::default());
    let mut dst = vec![Complex32::default(); 8];
    // SAFETY: the null source is rejected before anything is read.
    let src = unsafe { Source::from_raw(vec![BufferPtr::Interleaved(ptr::null_mut())]) };
    assert_eq!(
        plan.execute(src, Destination::slice_mut(&mut dst), cpu::ExecutionParameters),
        invalid(InvalidArgument::NullBuffer {
            side: Side::Source,
            index: 0
        })
    );
    assert_eq!(calls.count(), 0);
}

/// Planar buffers handed to an interleaved plan are a format mismatch
#[test]
fn planar_buffers_for_interleaved_plans() {
    let (mut plan, _) = cpu_plan(dft::Parameters::c2c(Direction::Forward, [8]), cpu::Parameters::default());
    let (re, im) = (vec![0.0f32; 8], vec![0.0f32; 8]);
    let mut dst = vec![Complex32::default(); 8];
    let err = plan
        .execute(Source::planar_ref(&re, &im), Destination::slice_mut(&mut dst), cpu::ExecutionParameters)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidArgument(InvalidArgument::TypeMismatch { side: Side::Source, .. })
            | Error::InvalidArgument(InvalidArgument::FormatMismatch { side: Side::Source, planar: true })
    ));
}

/// Execution parameters of another target are rejected; defaults resolve to the plan's own
#[test]
fn execution_parameters_follow_the_plan() {
    let (mut plan, calls) = cpu_plan(dft::Parameters::c2c(Direction::Forward, [8]), cpu::Parameters::default());
    let src = vec![Complex32::default(); 8];
    let mut dst = vec![Complex32::default(); 8];
    assert_eq!(
        plan.execute(
            Source::slice(&src),
            Destination::slice_mut(&mut dst),
            gpu_arch::ExecutionParameters::default()
        ),
        invalid(InvalidArgument::ExecutionTargetMismatch {
            expected: (Target::Cpu, Distribution::Spst),
            actual: (Target::Gpu, Distribution::Spst)
        })
    );
    plan.execute(Source::slice(&src), Destination::slice_mut(&mut dst), ExecutionParameters::Default)
        .unwrap();
    assert_eq!(calls.count(), 1);
}

fn spmt_plan(external_workspace: bool) -> (omnifft::Plan, Arc<Calls>) {
    let runtime = Arc::new(FourDevices);
    let (module, calls) = Module::accepting(Backend::CuFft);
    let mut registry = Registry::empty();
    registry.register(module).set_gpu_runtime(runtime.clone());
    let arch = spmt::gpu::Parameters {
        external_workspace,
        ..spmt::gpu::Parameters::with_devices([0, 1])
    };
    let desc = Desc::with_gpu_runtime(
        dft::Parameters::c2c(Direction::Forward, [32]),
        arch,
        Some(&*runtime),
    )
    .unwrap();
    let plan = registry.make_plan(desc, &BackendParameters::default()).unwrap();
    (plan, calls)
}

/// Multi-device plans need exactly one buffer per device on each side
#[test]
fn one_buffer_per_device() {
    let (mut plan, calls) = spmt_plan(false);
    assert_eq!(plan.backend(), Backend::CuFft);
    assert_eq!(plan.target_count(), 2);
    assert_eq!(plan.distribution(), Distribution::Spmt);

    let a = vec![Complex32::default(); 16];
    let b = vec![Complex32::default(); 16];
    let mut c = vec![Complex32::default(); 16];
    let mut d = vec![Complex32::default(); 16];
    assert_eq!(
        plan.execute(
            Source::per_target(vec![&a[..]]),
            Destination::per_target(vec![c.as_mut_slice(), d.as_mut_slice()]),
            spmt::gpu::ExecutionParameters::default()
        ),
        invalid(InvalidArgument::BufferCount {
            side: Side::Source,
            expected: 2,
            actual: 1
        })
    );
    assert_eq!(calls.count(), 0);

    plan.execute(
        Source::per_target(vec![&a[..], &b[..]]),
        Destination::per_target(vec![c.as_mut_slice(), d.as_mut_slice()]),
        spmt::gpu::ExecutionParameters::default(),
    )
    .unwrap();
    assert_eq!(calls.count(), 1);
}

/// Plans with external workspace need one non-null workspace per device
#[test]
fn external_workspace_is_checked() {
    let (mut plan, calls) = spmt_plan(true);
    let a = vec![Complex32::default(); 16];
    let b = vec![Complex32::default(); 16];
    let mut c = vec![Complex32::default(); 16];
    let mut d = vec![Complex32::default(); 16];
    let mut w0 = vec![0u8; 64];
    let mut w1 = vec![0u8; 64];

    let mut run = |workspaces: Vec<*mut c_void>| {
        plan.execute(
            Source::per_target(vec![&a[..], &b[..]]),
            Destination::per_target(vec![c.as_mut_slice(), d.as_mut_slice()]),
            spmt::gpu::ExecutionParameters {
                workspaces,
                ..Default::default()
            },
        )
    };
    assert_eq!(
        run(Vec::new()),
        invalid(InvalidArgument::WorkspaceCount {
            expected: 2,
            actual: 0
        })
    );
    assert_eq!(
        run(vec![w0.as_mut_ptr().cast(), ptr::null_mut()]),
        invalid(InvalidArgument::MissingWorkspace { index: 1 })
    );
    assert_eq!(run(vec![w0.as_mut_ptr().cast(), w1.as_mut_ptr().cast()]), Ok(()));
    assert_eq!(calls.count(), 1);
}

/// A device the runtime does not know is rejected when the descriptor is built
#[test]
fn unknown_device() {
    let arch = gpu_arch::Parameters {
        device: Some(9),
        ..Default::default()
    };
    assert_eq!(
        Desc::with_gpu_runtime(dft::Parameters::c2c(Direction::Forward, [8]), arch, Some(&FourDevices))
            .unwrap_err(),
        Error::InvalidArgument(InvalidArgument::InvalidDevice(9))
    );
}

/// Hooks a backend does not override report the missing pair
#[test]
fn missing_hook_is_not_implemented() {
    let runtime = FourDevices;
    let (module, calls) = Module::accepting(Backend::CuFft);
    let mut registry = Registry::empty();
    registry.register(module);
    let desc = Desc::with_gpu_runtime(
        dft::Parameters::c2c(Direction::Forward, [8]),
        gpu_arch::Parameters::default(),
        Some(&runtime),
    )
    .unwrap();
    let mut plan = registry.make_plan(desc, &BackendParameters::default()).unwrap();
    let src = vec![Complex32::default(); 8];
    let mut dst = vec![Complex32::default(); 8];
    assert_eq!(
        plan.execute(Source::slice(&src), Destination::slice_mut(&mut dst), ExecutionParameters::Default),
        Err(Error::not_implemented(Backend::CuFft, Target::Gpu, Distribution::Spst))
    );
    assert_eq!(calls.count(), 0);
}
