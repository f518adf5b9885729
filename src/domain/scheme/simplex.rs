use crate::domain::{
    Interval, ModuleConfig, Schedule,
    scheme::{EvaluationContext, Redundancy, SchemeKind},
};

/// No redundancy: one hardware unit running one software version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Simplex {
    hw: [usize; 1],
    sw: [usize; 1],
}

impl Simplex {
    pub(super) const fn new(hw: usize, sw: usize) -> Self {
        Self { hw: [hw], sw: [sw] }
    }
}

impl Redundancy for Simplex {
    fn kind(&self) -> SchemeKind {
        SchemeKind::Simplex
    }

    fn hardware(&self) -> &[usize] {
        &self.hw
    }

    fn software(&self) -> &[usize] {
        &self.sw
    }

    /// `[hw.lower * sw.upper, hw.upper * sw.upper]`.
    ///
    /// Both bounds use the software's upper reliability.
    fn reliability(&self, ctx: &EvaluationContext<'_>) -> Interval {
        let hw = ctx.module.hardware()[self.hw[0]].reliability;
        let sw = ctx.module.software()[self.sw[0]].reliability;
        Interval::new(hw.lower * sw.upper, hw.upper * sw.upper)
    }

    fn cost(&self, module: &ModuleConfig) -> u64 {
        module.hardware()[self.hw[0]].cost + module.software()[self.sw[0]].cost
    }

    fn execution_time(&self, module: &ModuleConfig) -> u64 {
        module.time(self.sw[0], self.hw[0])
    }

    fn schedule_fragment(&self, module: &ModuleConfig, schedule: &mut Schedule) {
        schedule.push_single(module.num(), self.execution_time(module));
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        ModuleConfig, Schedule, SchemeKind,
        module::tests::component,
        scheme::{
            Scheme,
            tests::{EPSILON, evaluate_alone, system_of},
        },
    };

    fn module() -> ModuleConfig {
        ModuleConfig::new(
            0,
            vec![component(0, 0.9, 0.95, 10), component(1, 0.5, 0.6, 1)],
            vec![component(0, 0.8, 0.85, 5), component(1, 0.1, 0.2, 100)],
            vec![vec![7, 3], vec![9, 1]],
        )
        .unwrap()
        .with_schemes([SchemeKind::Simplex])
    }

    #[test]
    fn single_module_scenario() {
        let system = system_of(vec![module()]);
        let scheme = Scheme::new(SchemeKind::Simplex, 0, &[0], &[0], &system).unwrap();

        let evaluation = evaluate_alone(&scheme, &system);

        assert!((evaluation.reliability.lower - 0.765).abs() < EPSILON);
        assert!((evaluation.reliability.upper - 0.8075).abs() < EPSILON);
        assert_eq!(evaluation.cost, 15);
        assert_eq!(evaluation.time, 7);
    }

    #[test]
    fn lower_bound_reuses_software_upper_reliability() {
        let system = system_of(vec![module()]);
        let scheme = Scheme::new(SchemeKind::Simplex, 0, &[1], &[1], &system).unwrap();

        let evaluation = evaluate_alone(&scheme, &system);

        assert!((evaluation.reliability.lower - 0.5 * 0.2).abs() < EPSILON);
        assert!((evaluation.reliability.upper - 0.6 * 0.2).abs() < EPSILON);
        assert_eq!(evaluation.cost, 101);
        assert_eq!(evaluation.time, 1);
    }

    #[test]
    fn emits_one_task() {
        let system = system_of(vec![module()]);
        let scheme = Scheme::new(SchemeKind::Simplex, 0, &[1], &[0], &system).unwrap();
        let mut schedule = Schedule::default();

        scheme.schedule_fragment(&system, &mut schedule);

        assert_eq!(schedule.tasks.len(), 1);
        assert_eq!(schedule.tasks[0].name, "t0");
        assert_eq!(schedule.tasks[0].processor, "p0");
        assert_eq!(schedule.tasks[0].duration, 3);
        assert_eq!(schedule.tasks[0].ordinal, 0);
        assert!(schedule.links.is_empty());
    }
}
