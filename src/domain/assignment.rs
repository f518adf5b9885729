//! Complete candidates: one scheme per module, evaluated in a single pass.

use rand::{Rng, seq::SliceRandom};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::{
    Classification, Interval, Schedule, Scheme, SchemeError, SchemeKind, SystemGraph,
    scheme::Evaluation,
};

/// Errors raised when a set of schemes does not form a candidate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignmentError {
    /// No scheme was given for a module.
    #[error("no scheme given for module {0}")]
    Missing(usize),
    /// More than one scheme was given for a module.
    #[error("more than one scheme given for module {0}")]
    Duplicate(usize),
    /// The scheme kind is not declared for the module.
    #[error("module {module} does not declare scheme {kind}")]
    Undeclared {
        /// The module position.
        module: usize,
        /// The undeclared kind.
        kind: SchemeKind,
    },
    /// The module declares no scheme to draw from.
    #[error("module {0} declares no schemes")]
    NoSchemes(usize),
    /// A selection is invalid.
    #[error(transparent)]
    Scheme(#[from] SchemeError),
}

/// Exactly one scheme per module of a system, ordered by module position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    schemes: Vec<Scheme>,
}

impl Assignment {
    /// Checks that `schemes` covers every module of `system` exactly once
    /// with a declared kind.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing, repeated or unknown module, or an
    /// undeclared scheme kind.
    pub fn new(system: &SystemGraph, schemes: Vec<Scheme>) -> Result<Self, AssignmentError> {
        let mut slots: Vec<Option<Scheme>> = vec![None; system.len()];
        for scheme in schemes {
            let module = scheme.module();
            let config = system
                .module(module)
                .ok_or(SchemeError::UnknownModule(module))?;
            if !config.declares(scheme.kind()) {
                return Err(AssignmentError::Undeclared {
                    module,
                    kind: scheme.kind(),
                });
            }
            if slots[module].replace(scheme).is_some() {
                return Err(AssignmentError::Duplicate(module));
            }
        }

        let schemes = slots
            .into_iter()
            .enumerate()
            .map(|(module, slot)| slot.ok_or(AssignmentError::Missing(module)))
            .collect::<Result<_, _>>()?;
        Ok(Self { schemes })
    }

    /// Draws a declared kind and a random selection for every module.
    ///
    /// # Errors
    ///
    /// Returns an error if a module declares no scheme, or its catalog is
    /// too small for the kind drawn.
    pub fn random<R: Rng + ?Sized>(
        system: &SystemGraph,
        rng: &mut R,
    ) -> Result<Self, AssignmentError> {
        let schemes = system
            .modules()
            .iter()
            .map(|module| {
                let kind = *module
                    .schemes()
                    .choose(rng)
                    .ok_or_else(|| AssignmentError::NoSchemes(module.num()))?;
                Ok(Scheme::random(kind, module.num(), system, rng)?)
            })
            .collect::<Result<_, AssignmentError>>()?;
        Ok(Self { schemes })
    }

    /// Schemes, by module position.
    #[must_use]
    pub fn schemes(&self) -> &[Scheme] {
        &self.schemes
    }

    /// The scheme kind and selected hardware of every module.
    #[must_use]
    pub fn classification(&self) -> Classification {
        self.schemes.iter().collect()
    }

    /// Evaluates every module against one classification of the whole
    /// candidate.
    ///
    /// Module reliabilities compose in series. The reconfiguration mechanism
    /// is paid for once if any module uses hardware reconfiguration.
    #[must_use]
    #[instrument(skip_all, fields(modules = self.schemes.len()))]
    pub fn evaluate(&self, system: &SystemGraph) -> SystemEvaluation {
        let classification = self.classification();
        let modules: Vec<Evaluation> = self
            .schemes
            .iter()
            .map(|scheme| scheme.evaluate(system, &classification))
            .collect();

        let mut cost: u64 = modules.iter().map(|evaluation| evaluation.cost).sum();
        if modules
            .iter()
            .any(|evaluation| evaluation.kind == SchemeKind::HardwareReconfiguration)
        {
            cost += system.reconfiguration().cost;
        }
        let reliability = modules
            .iter()
            .fold(Interval::point(1.0), |acc, evaluation| {
                acc.product(evaluation.reliability)
            });
        debug!(cost, %reliability, "evaluated candidate");

        SystemEvaluation {
            modules,
            cost,
            reliability,
        }
    }

    /// Every module's schedule fragment, in module order.
    #[must_use]
    pub fn schedule(&self, system: &SystemGraph) -> Schedule {
        let mut schedule = Schedule::default();
        for scheme in &self.schemes {
            scheme.schedule_fragment(system, &mut schedule);
        }
        schedule
    }
}

/// The objectives of a whole candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemEvaluation {
    /// Per-module results, by position.
    pub modules: Vec<Evaluation>,
    /// Total cost.
    pub cost: u64,
    /// Series reliability.
    pub reliability: Interval,
}

impl SystemEvaluation {
    /// Whether the candidate respects the system's cost and reliability
    /// budgets. A missing budget is always met.
    #[must_use]
    pub fn within_budget(&self, system: &SystemGraph) -> bool {
        let cost_ok = system.limit_cost().is_none_or(|limit| self.cost <= limit);
        let rel_ok = system
            .limit_rel()
            .is_none_or(|limit| self.reliability.lower >= limit);
        cost_ok && rel_ok
    }
}

/// Evaluates candidates in parallel. Each candidate gets its own
/// classification; results keep the input order.
#[must_use]
pub fn evaluate_many(system: &SystemGraph, candidates: &[Assignment]) -> Vec<SystemEvaluation> {
    candidates
        .par_iter()
        .map(|candidate| candidate.evaluate(system))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::domain::{
        Link, ModuleConfig, ReconfigurationMechanism,
        module::tests::{catalog, component},
        scheme::tests::EPSILON,
    };

    fn all_kinds(num: usize) -> ModuleConfig {
        catalog(num, 3, 4).with_schemes(SchemeKind::ALL)
    }

    fn system() -> SystemGraph {
        SystemGraph::new(
            vec![all_kinds(0), all_kinds(1), all_kinds(2)],
            vec![Link {
                src: 0,
                dst: 1,
                volume: 2,
            }],
        )
        .unwrap()
    }

    fn simplex(module: usize, system: &SystemGraph) -> Scheme {
        Scheme::new(SchemeKind::Simplex, module, &[0], &[0], system).unwrap()
    }

    #[test]
    fn orders_schemes_by_module() {
        let system = system();
        let assignment = Assignment::new(
            &system,
            vec![simplex(2, &system), simplex(0, &system), simplex(1, &system)],
        )
        .unwrap();

        let modules: Vec<_> = assignment.schemes().iter().map(Scheme::module).collect();
        assert_eq!(modules, [0, 1, 2]);
    }

    #[test]
    fn rejects_incomplete_or_repeated_candidates() {
        let system = system();

        assert_eq!(
            Assignment::new(&system, vec![simplex(0, &system), simplex(2, &system)]),
            Err(AssignmentError::Missing(1))
        );
        assert_eq!(
            Assignment::new(
                &system,
                vec![
                    simplex(0, &system),
                    simplex(1, &system),
                    simplex(1, &system),
                    simplex(2, &system)
                ]
            ),
            Err(AssignmentError::Duplicate(1))
        );
    }

    #[test]
    fn rejects_undeclared_kinds() {
        let system = SystemGraph::new(
            vec![catalog(0, 3, 4).with_schemes([SchemeKind::Simplex])],
            vec![],
        )
        .unwrap();
        let scheme = Scheme::new(SchemeKind::RecoveryBlock, 0, &[0, 1], &[0, 1], &system).unwrap();

        assert_eq!(
            Assignment::new(&system, vec![scheme]),
            Err(AssignmentError::Undeclared {
                module: 0,
                kind: SchemeKind::RecoveryBlock
            })
        );
    }

    #[test]
    fn system_objectives_compose_in_series() {
        let system = system();
        let assignment = Assignment::new(
            &system,
            (0..3).map(|module| simplex(module, &system)).collect(),
        )
        .unwrap();

        let evaluation = assignment.evaluate(&system);

        // Each simplex module: hw [0.9, 0.95], sw upper 0.85, cost 10 + 5.
        let lower = (0.9_f64 * 0.85).powi(3);
        let upper = (0.95_f64 * 0.85).powi(3);
        assert!((evaluation.reliability.lower - lower).abs() < EPSILON);
        assert!((evaluation.reliability.upper - upper).abs() < EPSILON);
        assert_eq!(evaluation.cost, 45);
        assert_eq!(evaluation.modules.len(), 3);
    }

    #[test]
    fn mechanism_is_paid_once() {
        let system = system().with_reconfiguration(ReconfigurationMechanism {
            reliability: Interval::new(0.9, 0.99),
            cost: 100,
        });
        let hwrc = |module| {
            Scheme::new(SchemeKind::HardwareReconfiguration, module, &[0], &[0], &system).unwrap()
        };
        let assignment =
            Assignment::new(&system, vec![hwrc(0), hwrc(1), simplex(2, &system)]).unwrap();

        assert_eq!(assignment.evaluate(&system).cost, 3 * 15 + 100);

        let without =
            Assignment::new(&system, (0..3).map(|m| simplex(m, &system)).collect()).unwrap();
        assert_eq!(without.evaluate(&system).cost, 3 * 15);
    }

    #[test]
    fn evaluation_does_not_depend_on_input_order() {
        let system = system();
        let hwrc = |module, hw| {
            Scheme::new(SchemeKind::HardwareReconfiguration, module, &[hw], &[0], &system)
                .unwrap()
        };

        let forward = Assignment::new(&system, vec![hwrc(0, 0), hwrc(1, 1), hwrc(2, 2)]).unwrap();
        let backward = Assignment::new(&system, vec![hwrc(2, 2), hwrc(1, 1), hwrc(0, 0)]).unwrap();

        assert_eq!(forward.evaluate(&system), backward.evaluate(&system));
    }

    #[test]
    fn budgets_gate_candidates() {
        let assignment_for = |system: &SystemGraph| {
            Assignment::new(system, (0..3).map(|m| simplex(m, system)).collect()).unwrap()
        };

        let system = system().with_limit_cost(Some(45)).with_limit_rel(Some(0.3));
        assert!(assignment_for(&system).evaluate(&system).within_budget(&system));

        let system = system.with_limit_cost(Some(44));
        assert!(!assignment_for(&system).evaluate(&system).within_budget(&system));

        let system = system.with_limit_cost(None).with_limit_rel(Some(0.99));
        assert!(!assignment_for(&system).evaluate(&system).within_budget(&system));
    }

    #[test]
    fn schedule_concatenates_fragments() {
        let system = system();
        let assignment = Assignment::new(
            &system,
            vec![
                simplex(0, &system),
                Scheme::new(SchemeKind::NvpTriple, 1, &[0, 1, 2], &[0, 1, 2], &system).unwrap(),
                Scheme::new(SchemeKind::RecoveryBlock, 2, &[0, 1], &[0, 1], &system).unwrap(),
            ],
        )
        .unwrap();

        let schedule = assignment.schedule(&system);

        assert_eq!(schedule.tasks.len(), 1 + 5 + 4);
        assert_eq!(schedule.links.len(), 4 + 2);
        assert_eq!(schedule.tasks[0].name, "t0");
        assert_eq!(schedule.tasks[1].name, "t1_rcv");
    }

    #[test]
    fn random_candidates_use_declared_kinds() {
        let system = SystemGraph::new(
            vec![
                catalog(0, 2, 3).with_schemes([SchemeKind::NvpSingle]),
                catalog(1, 2, 3).with_schemes([SchemeKind::RecoveryBlock, SchemeKind::Simplex]),
            ],
            vec![],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..20 {
            let assignment = Assignment::random(&system, &mut rng).unwrap();
            assert_eq!(assignment.schemes()[0].kind(), SchemeKind::NvpSingle);
            assert!(system.modules()[1].declares(assignment.schemes()[1].kind()));
        }
    }

    #[test]
    fn random_requires_declared_schemes() {
        let system = SystemGraph::new(vec![catalog(0, 1, 1)], vec![]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(
            Assignment::random(&system, &mut rng),
            Err(AssignmentError::NoSchemes(0))
        );
    }

    #[test]
    fn parallel_evaluation_matches_sequential() {
        let system = system();
        let mut rng = StdRng::seed_from_u64(9);
        let candidates: Vec<_> = (0..32)
            .map(|_| Assignment::random(&system, &mut rng).unwrap())
            .collect();

        let parallel = evaluate_many(&system, &candidates);
        let sequential: Vec<_> = candidates.iter().map(|c| c.evaluate(&system)).collect();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn single_component_catalog_evaluates() {
        let module = ModuleConfig::new(
            0,
            vec![component(0, 0.9, 0.95, 10)],
            vec![component(0, 0.8, 0.85, 5)],
            vec![vec![7]],
        )
        .unwrap()
        .with_schemes([SchemeKind::Simplex]);
        let system = SystemGraph::new(vec![module], vec![]).unwrap();
        let assignment = Assignment::new(&system, vec![simplex(0, &system)]).unwrap();

        let evaluation = assignment.evaluate(&system);

        assert!((evaluation.reliability.lower - 0.765).abs() < EPSILON);
        assert!((evaluation.reliability.upper - 0.8075).abs() < EPSILON);
        assert_eq!(evaluation.cost, 15);
    }
}
