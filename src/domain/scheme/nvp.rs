// N-version programming on one or three hardware units.

use crate::domain::{
    Bound, FaultModel, Interval, ModuleConfig, Schedule,
    schedule::{FAN_IN, FAN_OUT, WORK, sub_processor_name, sub_task_name},
    scheme::{EvaluationContext, Redundancy, SchemeKind},
};

/// Failure probability of the recovery/detection/acceptance cascade that
/// precedes the voting stage, and the probability of reaching that stage.
///
/// Up to three recovery attempts, then fault detection, then acceptance.
#[allow(clippy::suboptimal_flops)]
fn cascade(fault: &FaultModel, bound: Bound) -> (f64, f64) {
    let rv = fault.qrv.at(bound);
    let d = fault.qd.at(bound);
    let all = fault.qall.at(bound);
    let qrv3 = rv.q * rv.q * rv.q;

    let failure = rv.p + rv.q * rv.p + rv.q * rv.q * rv.p + qrv3 * d.p + qrv3 * d.q * all.p;
    (failure, qrv3 * d.q * all.q)
}

/// Three distinct software versions on one hardware unit, 2-of-3 vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NvpSingle {
    hw: [usize; 1],
    sw: [usize; 3],
}

impl NvpSingle {
    pub(super) const fn new(hw: usize, sw: [usize; 3]) -> Self {
        Self { hw: [hw], sw }
    }
}

impl Redundancy for NvpSingle {
    fn kind(&self) -> SchemeKind {
        SchemeKind::NvpSingle
    }

    fn hardware(&self) -> &[usize] {
        &self.hw
    }

    fn software(&self) -> &[usize] {
        &self.sw
    }

    #[allow(clippy::suboptimal_flops, clippy::similar_names)]
    fn reliability(&self, ctx: &EvaluationContext<'_>) -> Interval {
        let module = ctx.module;
        let hw = module.hardware()[self.hw[0]].reliability;
        let sw = self.sw.map(|i| module.software()[i].reliability);

        Interval::from_failure_fn(|bound| {
            let (prelude, reached) = cascade(&module.fault, bound);
            let h = hw.at(bound);
            let [s0, s1, s2] = sw.map(|s| s.at(bound));

            // At least two of the three versions fail.
            let vote = s0.p * s1.p + s0.q * s1.p * s2.p + s1.q * s0.p * s2.p;

            prelude + reached * h.p + reached * h.q * vote
        })
    }

    fn cost(&self, module: &ModuleConfig) -> u64 {
        module.hardware()[self.hw[0]].cost
            + self
                .sw
                .iter()
                .map(|&i| module.software()[i].cost)
                .sum::<u64>()
    }

    fn execution_time(&self, module: &ModuleConfig) -> u64 {
        self.sw
            .iter()
            .map(|&sw| module.time(sw, self.hw[0]))
            .sum::<u64>()
            + module.overheads.vote
    }

    fn schedule_fragment(&self, module: &ModuleConfig, schedule: &mut Schedule) {
        schedule.push_single(module.num(), self.execution_time(module));
    }
}

/// Three replicas, each a (hardware, software) pair, 2-of-3 vote.
///
/// Hardware units may repeat; software versions are distinct. Replica `i` is
/// `(hw[i], sw[i])`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NvpTriple {
    hw: [usize; 3],
    sw: [usize; 3],
}

impl NvpTriple {
    pub(super) const fn new(hw: [usize; 3], sw: [usize; 3]) -> Self {
        Self { hw, sw }
    }

    fn replica_time(&self, module: &ModuleConfig, replica: usize) -> u64 {
        module.time(self.sw[replica], self.hw[replica])
    }
}

impl Redundancy for NvpTriple {
    fn kind(&self) -> SchemeKind {
        SchemeKind::NvpTriple
    }

    fn hardware(&self) -> &[usize] {
        &self.hw
    }

    fn software(&self) -> &[usize] {
        &self.sw
    }

    #[allow(clippy::suboptimal_flops, clippy::similar_names)]
    fn reliability(&self, ctx: &EvaluationContext<'_>) -> Interval {
        let module = ctx.module;
        let hw = self.hw.map(|i| module.hardware()[i].reliability);
        let sw = self.sw.map(|i| module.software()[i].reliability);

        Interval::from_failure_fn(|bound| {
            let (prelude, reached) = cascade(&module.fault, bound);
            let [h0, h1, h2] = hw.map(|h| h.at(bound));
            let [s0, s1, s2] = sw.map(|s| s.at(bound));

            // Expansion over the failure combinations of the three replicas
            // that defeat a 2-of-3 vote.
            let vote = s0.p * s1.p
                + s0.p * s2.p * s1.q
                + s2.p * s1.p * s0.q
                + s0.p * h0.p * h1.p * s1.q * s2.q * h2.q
                + h0.p * h2.p * h1.q * s2.q * (1.0 - s0.p * s1.p)
                + s2.p * h0.p * h2.p * s0.q * s1.q * h1.q
                + h1.p * h2.p * h0.q * s1.q * (1.0 - s0.p * s2.p)
                + s1.p * h1.p * h2.p * s0.q * s2.q * h0.q
                + h0.p * h1.p * h2.q * s0.q * (1.0 - s2.p * s1.p)
                + s0.p * h0.q * s1.q * h1.q * s2.q * h2.p
                + s0.p * h0.q * s1.q * h1.p * s2.q * h2.q
                + s0.q * h0.q * s1.p * h1.q * s2.q * h2.p
                + s0.q * h0.p * s1.p * h1.q * s2.q * h2.q
                + s0.q * h0.q * s1.q * h1.p * s2.p * h2.q
                + s0.q * h0.p * s1.q * h1.q * s2.p * h2.q;

            prelude + reached * vote
        })
    }

    fn cost(&self, module: &ModuleConfig) -> u64 {
        let hardware: u64 = self.hw.iter().map(|&i| module.hardware()[i].cost).sum();
        let software: u64 = self.sw.iter().map(|&i| module.software()[i].cost).sum();
        hardware + software
    }

    fn execution_time(&self, module: &ModuleConfig) -> u64 {
        (0..3)
            .map(|replica| self.replica_time(module, replica))
            .max()
            .unwrap_or_default()
            + module.overheads.vote
    }

    /// Fan-out, three parallel replicas, fan-in.
    fn schedule_fragment(&self, module: &ModuleConfig, schedule: &mut Schedule) {
        let n = module.num();
        let receive = sub_task_name(n, "rcv");
        let send = sub_task_name(n, "snd");

        schedule.push_task(receive.clone(), 0, sub_processor_name(n, 1), FAN_OUT);
        schedule.push_task(
            sub_task_name(n, 1),
            self.replica_time(module, 0),
            sub_processor_name(n, 1),
            WORK,
        );
        schedule.push_task(
            sub_task_name(n, 2),
            self.replica_time(module, 1),
            sub_processor_name(n, 2),
            FAN_OUT,
        );
        schedule.push_task(
            sub_task_name(n, 3),
            self.replica_time(module, 2),
            sub_processor_name(n, 3),
            FAN_OUT,
        );
        schedule.push_task(
            send.clone(),
            module.overheads.vote,
            sub_processor_name(n, 1),
            FAN_IN,
        );

        schedule.push_link(receive.clone(), sub_task_name(n, 2), module.input());
        schedule.push_link(receive, sub_task_name(n, 3), module.input());
        schedule.push_link(sub_task_name(n, 2), send.clone(), module.output());
        schedule.push_link(sub_task_name(n, 3), send, module.output());
    }
}
