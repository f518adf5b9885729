use crate::domain::{
    Interval, ModuleConfig, Schedule,
    schedule::{FAN_IN, FAN_OUT, WORK, sub_processor_name, sub_task_name},
    scheme::{EvaluationContext, Redundancy, SchemeKind},
};

/// Primary and alternate software versions, each executed on both of two
/// hardware units, gated by an acceptance test.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecoveryBlock {
    hw: [usize; 2],
    sw: [usize; 2],
}

impl RecoveryBlock {
    pub(super) const fn new(hw: [usize; 2], sw: [usize; 2]) -> Self {
        Self { hw, sw }
    }

    /// Duration of the path on hardware `path`: both versions, two tests and
    /// a recovery.
    fn path_time(&self, module: &ModuleConfig, path: usize) -> u64 {
        let hw = self.hw[path];
        module.time(self.sw[0], hw)
            + module.time(self.sw[1], hw)
            + 2 * module.overheads.test
            + module.overheads.recovery
    }
}

impl Redundancy for RecoveryBlock {
    fn kind(&self) -> SchemeKind {
        SchemeKind::RecoveryBlock
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
            let rv = module.fault.qrv.at(bound);
            let d = module.fault.qd.at(bound);
            let all = module.fault.qall.at(bound);
            let [h0, h1] = hw.map(|h| h.at(bound));
            let [s0, s1] = sw.map(|s| s.at(bound));
            let reached = rv.q * d.q * all.q;
            let both_hw = h0.p * h1.p;

            rv.p + rv.q * d.p
                + rv.q * d.q * all.p
                + reached * both_hw
                + reached * (1.0 - both_hw) * s0.p * s1.p
        })
    }

    /// Software is paid for on each hardware path.
    fn cost(&self, module: &ModuleConfig) -> u64 {
        let hardware: u64 = self.hw.iter().map(|&i| module.hardware()[i].cost).sum();
        let software: u64 = self.sw.iter().map(|&i| module.software()[i].cost).sum();
        hardware + 2 * software
    }

    fn execution_time(&self, module: &ModuleConfig) -> u64 {
        self.path_time(module, 0).max(self.path_time(module, 1))
    }

    fn schedule_fragment(&self, module: &ModuleConfig, schedule: &mut Schedule) {
        let n = module.num();
        let receive = sub_task_name(n, "rcv");
        let send = sub_task_name(n, "snd");

        schedule.push_task(receive.clone(), 0, sub_processor_name(n, 1), FAN_OUT);
        schedule.push_task(
            sub_task_name(n, 1),
            self.path_time(module, 0),
            sub_processor_name(n, 1),
            WORK,
        );
        schedule.push_task(
            sub_task_name(n, 2),
            self.path_time(module, 1),
            sub_processor_name(n, 2),
            FAN_OUT,
        );
        schedule.push_task(send.clone(), 0, sub_processor_name(n, 1), FAN_IN);

        schedule.push_link(receive, sub_task_name(n, 2), module.input());
        schedule.push_link(sub_task_name(n, 2), send, module.output());
    }
}

#[cfg(test)]
#[allow(clippy::suboptimal_flops)]
mod tests {
    use crate::domain::{
        FaultModel, Interval, Link, ModuleConfig, Overheads, Schedule, SchemeKind, SystemGraph,
        module::tests::{catalog, component},
        scheme::{
            Scheme,
            tests::{EPSILON, evaluate_alone, system_of},
        },
    };

    fn overheads() -> Overheads {
        Overheads {
            vote: 100,
            test: 2,
            recovery: 3,
        }
    }

    #[test]
    fn reliability_splits_on_hardware_failure() {
        let fault = FaultModel {
            qrv: Interval::new(0.9, 0.95),
            qd: Interval::new(0.97, 0.99),
            qall: Interval::new(0.98, 0.995),
        };
        let module = ModuleConfig::new(
            0,
            vec![component(0, 0.9, 0.95, 1), component(1, 0.7, 0.8, 1)],
            vec![component(0, 0.8, 0.85, 1), component(1, 0.6, 0.9, 1)],
            vec![vec![1, 1], vec![1, 1]],
        )
        .unwrap()
        .with_fault_model(fault);
        let system = system_of(vec![module]);
        let scheme = Scheme::new(SchemeKind::RecoveryBlock, 0, &[0, 1], &[0, 1], &system).unwrap();

        let evaluation = evaluate_alone(&scheme, &system);

        let side = |qrv: f64, prv: f64, qd: f64, pd: f64, qall: f64, pall: f64, phw: f64, psw: f64| {
            prv + qrv * pd + qrv * qd * pall + qrv * qd * qall * phw + qrv * qd * qall * (1.0 - phw) * psw
        };
        let p_l = side(0.9, 0.05, 0.97, 0.01, 0.98, 0.005, 0.05 * 0.2, 0.15 * 0.1);
        let p_r = side(0.95, 0.1, 0.99, 0.03, 0.995, 0.02, 0.1 * 0.3, 0.2 * 0.4);

        assert!((evaluation.reliability.lower - (1.0 - p_r)).abs() < EPSILON);
        assert!((evaluation.reliability.upper - (1.0 - p_l)).abs() < EPSILON);
    }

    #[test]
    fn cost_pays_software_per_path() {
        // hw cost 10 + i, sw cost 5 + i.
        let system = system_of(vec![catalog(0, 2, 3)]);
        let scheme = Scheme::new(SchemeKind::RecoveryBlock, 0, &[1, 1], &[2, 0], &system).unwrap();

        let evaluation = evaluate_alone(&scheme, &system);

        assert_eq!(evaluation.cost, 11 + 11 + 2 * (7 + 5));
    }

    #[test]
    fn time_is_slower_path_plus_overheads() {
        // time 10 * (sw + 1) + hw.
        let system = system_of(vec![catalog(0, 2, 3).with_overheads(overheads())]);
        let scheme = Scheme::new(SchemeKind::RecoveryBlock, 0, &[0, 1], &[0, 2], &system).unwrap();

        let evaluation = evaluate_alone(&scheme, &system);

        assert_eq!(evaluation.time, (11 + 31) + 2 * 2 + 3);
    }

    #[test]
    fn unselected_variants_do_not_affect_objectives() {
        let base = catalog(0, 3, 4);
        let mut hardware = base.hardware().to_vec();
        let mut software = base.software().to_vec();
        hardware[2] = component(2, 0.1, 0.2, 9_999);
        software[3] = component(3, 0.01, 0.02, 9_999);
        let mut times = base.times().to_vec();
        times[3] = vec![1_000; 3];
        for row in &mut times {
            row[2] = 1_000;
        }
        let altered = ModuleConfig::new(0, hardware, software, times).unwrap();

        let a = system_of(vec![base]);
        let b = system_of(vec![altered]);
        let scheme_a = Scheme::new(SchemeKind::RecoveryBlock, 0, &[0, 1], &[0, 2], &a).unwrap();
        let scheme_b = Scheme::new(SchemeKind::RecoveryBlock, 0, &[0, 1], &[0, 2], &b).unwrap();

        assert_eq!(evaluate_alone(&scheme_a, &a), evaluate_alone(&scheme_b, &b));
    }

    #[test]
    fn fragment_has_two_paths_and_fan_in() {
        let modules = vec![
            catalog(0, 1, 1),
            catalog(1, 2, 2).with_overheads(overheads()),
            catalog(2, 1, 1),
        ];
        let links = vec![
            Link {
                src: 0,
                dst: 1,
                volume: 4,
            },
            Link {
                src: 1,
                dst: 2,
                volume: 6,
            },
        ];
        let system = SystemGraph::new(modules, links).unwrap();
        let scheme = Scheme::new(SchemeKind::RecoveryBlock, 1, &[0, 1], &[0, 1], &system).unwrap();
        let mut schedule = Schedule::default();

        scheme.schedule_fragment(&system, &mut schedule);

        let tasks: Vec<_> = schedule
            .tasks
            .iter()
            .map(|t| (t.name.as_str(), t.duration, t.processor.as_str(), t.ordinal))
            .collect();
        assert_eq!(
            tasks,
            [
                ("t1_rcv", 0, "p1_1", 0),
                ("t1_1", 10 + 20 + 4 + 3, "p1_1", 1),
                ("t1_2", 11 + 21 + 4 + 3, "p1_2", 0),
                ("t1_snd", 0, "p1_1", 2),
            ]
        );
        let links: Vec<_> = schedule
            .links
            .iter()
            .map(|l| (l.src.as_str(), l.dst.as_str(), l.volume))
            .collect();
        assert_eq!(links, [("t1_rcv", "t1_2", 4), ("t1_2", "t1_snd", 6)]);
    }
}
