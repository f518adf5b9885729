//! The system graph: module catalog entries joined by data links.

use std::collections::BTreeSet;

use petgraph::{
    algo::{tarjan_scc, toposort},
    graphmap::DiGraphMap,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::{
    CatalogError, GenerationParams, Interval, ModuleConfig, module::Derived,
};

/// A directed data link between two modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Source module position.
    pub src: usize,
    /// Destination module position.
    pub dst: usize,
    /// Volume of data sent along the link.
    pub volume: u64,
}

/// The shared hardware-reconfiguration mechanism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconfigurationMechanism {
    /// Probability that a reconfiguration succeeds.
    pub reliability: Interval,
    /// Cost, paid once per system.
    pub cost: u64,
}

/// Errors raised while assembling a [`SystemGraph`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemError {
    /// Module numbers must be exactly `0..n`.
    #[error("module at position {position} is numbered {num}")]
    NonContiguous {
        /// Position after sorting.
        position: usize,
        /// Declared number.
        num: usize,
    },
    /// A link refers to a module that does not exist.
    #[error("link refers to unknown module {0}")]
    UnknownModule(usize),
    /// The links form a cycle.
    #[error("links form a cycle through modules {0:?}")]
    Cycle(Vec<usize>),
    /// A module catalog entry is invalid.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Modules, links and system-wide budgets.
///
/// Module `i` is always at position `i`. Links form a DAG; every graph-derived
/// quantity on [`ModuleConfig`] (predecessors, dependency closure, traffic,
/// propagated times) is computed once, here.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemGraph {
    modules: Vec<ModuleConfig>,
    links: Vec<Link>,
    limit_cost: Option<u64>,
    limit_rel: Option<f64>,
    reconfiguration: Option<ReconfigurationMechanism>,
}

impl SystemGraph {
    /// Assembles a system and derives every graph quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if module numbers are not `0..n`, a link refers to a
    /// missing module, or the links form a cycle.
    #[instrument(skip_all, fields(modules = modules.len(), links = links.len()))]
    pub fn new(mut modules: Vec<ModuleConfig>, links: Vec<Link>) -> Result<Self, SystemError> {
        modules.sort_by_key(ModuleConfig::num);
        if let Some((position, module)) = modules
            .iter()
            .enumerate()
            .find(|(position, module)| module.num() != *position)
        {
            return Err(SystemError::NonContiguous {
                position,
                num: module.num(),
            });
        }

        let mut graph = DiGraphMap::with_capacity(modules.len(), links.len());
        for module in &modules {
            graph.add_node(module.num());
        }
        for link in &links {
            for end in [link.src, link.dst] {
                if end >= modules.len() {
                    return Err(SystemError::UnknownModule(end));
                }
            }
            graph.add_edge(link.src, link.dst, link.volume);
        }

        let order = toposort(&graph, None).map_err(|_| SystemError::Cycle(first_cycle(&graph)))?;
        derive_graph_data(&mut modules, &links, &order);
        debug!("system graph assembled");

        Ok(Self {
            modules,
            links,
            limit_cost: None,
            limit_rel: None,
            reconfiguration: None,
        })
    }

    /// Sets the cost budget.
    #[must_use]
    pub const fn with_limit_cost(mut self, limit: Option<u64>) -> Self {
        self.limit_cost = limit;
        self
    }

    /// Sets the reliability budget.
    #[must_use]
    pub const fn with_limit_rel(mut self, limit: Option<f64>) -> Self {
        self.limit_rel = limit;
        self
    }

    /// Declares the reconfiguration mechanism.
    #[must_use]
    pub const fn with_reconfiguration(mut self, mechanism: ReconfigurationMechanism) -> Self {
        self.reconfiguration = Some(mechanism);
        self
    }

    /// Draws a random system: modules from `params`, and a link `i -> j` for
    /// each `i < j` with probability `params.link_probability`.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` describes an empty catalog.
    pub fn generate<R: Rng + ?Sized>(
        params: &GenerationParams,
        rng: &mut R,
    ) -> Result<Self, SystemError> {
        let modules = (0..params.modules)
            .map(|num| ModuleConfig::generate(num, params, rng))
            .collect::<Result<Vec<_>, _>>()?;

        let probability = params.link_probability.clamp(0.0, 1.0);
        let (min_volume, max_volume) = if params.min_volume <= params.max_volume {
            (params.min_volume, params.max_volume)
        } else {
            (params.max_volume, params.min_volume)
        };
        let mut links = Vec::new();
        for src in 0..params.modules {
            for dst in src + 1..params.modules {
                if rng.gen_bool(probability) {
                    links.push(Link {
                        src,
                        dst,
                        volume: rng.gen_range(min_volume..=max_volume),
                    });
                }
            }
        }

        let mut system = Self::new(modules, links)?.with_limit_cost(params.limit_cost);
        system.reconfiguration = params.reconfiguration;
        Ok(system)
    }

    /// Module catalog entries, by position.
    #[must_use]
    pub fn modules(&self) -> &[ModuleConfig] {
        &self.modules
    }

    /// The module at `position`.
    #[must_use]
    pub fn module(&self, position: usize) -> Option<&ModuleConfig> {
        self.modules.get(position)
    }

    /// Links, in declaration order.
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the system has no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The link from `src` to `dst`, if any.
    #[must_use]
    pub fn find_link(&self, src: usize, dst: usize) -> Option<&Link> {
        self.links.iter().find(|link| link.src == src && link.dst == dst)
    }

    /// Modules with no successors.
    #[must_use]
    pub fn terminals(&self) -> Vec<usize> {
        self.modules
            .iter()
            .filter(|module| module.successors().is_empty())
            .map(ModuleConfig::num)
            .collect()
    }

    /// Every module's deadline, or `None` if any module lacks one.
    #[must_use]
    pub fn deadlines(&self) -> Option<Vec<u64>> {
        self.modules.iter().map(|module| module.deadline).collect()
    }

    /// Sum of the per-module cost intervals.
    #[must_use]
    pub fn cost_interval(&self) -> (u64, u64) {
        self.modules
            .iter()
            .map(ModuleConfig::cost_interval)
            .fold((0, 0), |(lower, upper), (min, max)| (lower + min, upper + max))
    }

    /// Propagated earliest and latest completion times, by position.
    #[must_use]
    pub fn time_intervals(&self) -> (Vec<u64>, Vec<u64>) {
        self.modules
            .iter()
            .map(|module| (module.min_time(), module.max_time()))
            .unzip()
    }

    /// Cost budget.
    #[must_use]
    pub const fn limit_cost(&self) -> Option<u64> {
        self.limit_cost
    }

    /// Reliability budget.
    #[must_use]
    pub const fn limit_rel(&self) -> Option<f64> {
        self.limit_rel
    }

    /// The declared reconfiguration mechanism.
    #[must_use]
    pub const fn mechanism(&self) -> Option<ReconfigurationMechanism> {
        self.reconfiguration
    }

    /// The reconfiguration mechanism in effect. Without a declared mechanism
    /// every reconfiguration fails and nothing is paid.
    #[must_use]
    pub fn reconfiguration(&self) -> ReconfigurationMechanism {
        self.reconfiguration.unwrap_or_default()
    }
}

/// Members of the lowest-numbered cycle.
fn first_cycle(graph: &DiGraphMap<usize, u64>) -> Vec<usize> {
    let mut cycles: Vec<Vec<usize>> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || component.first().is_some_and(|&n| graph.contains_edge(n, n))
        })
        .map(|mut component| {
            component.sort_unstable();
            component
        })
        .collect();
    cycles.sort();
    cycles.into_iter().next().unwrap_or_default()
}

/// Fills in the graph-derived data of every module, visiting them in
/// topological order so each predecessor is complete before its successors.
fn derive_graph_data(modules: &mut [ModuleConfig], links: &[Link], order: &[usize]) {
    for module in modules.iter_mut() {
        module.derived = Derived::default();
    }
    for link in links {
        let src = &mut modules[link.src].derived;
        src.successors.push((link.dst, link.volume));
        src.output += link.volume;
        let dst = &mut modules[link.dst].derived;
        dst.predecessors.insert(link.src);
        dst.input += link.volume;
    }

    for &position in order {
        let predecessors = modules[position].derived.predecessors.clone();
        let mut dependencies = BTreeSet::new();
        let mut earliest = 0;
        let mut latest = 0;
        for &predecessor in &predecessors {
            let derived = &modules[predecessor].derived;
            dependencies.insert(predecessor);
            dependencies.extend(derived.dependencies.iter().copied());
            earliest = earliest.max(derived.min_time);
            latest = latest.max(derived.max_time);
        }

        let module = &mut modules[position];
        let (own_min, own_max) = module.time_interval();
        let output = module.derived.output;
        module.derived.dependencies = dependencies;
        module.derived.min_time = earliest + own_min + output;
        module.derived.max_time = latest + own_max + output;
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::domain::{SchemeKind, module::tests::catalog};

    fn link(src: usize, dst: usize, volume: u64) -> Link {
        Link { src, dst, volume }
    }

    fn chain() -> SystemGraph {
        SystemGraph::new(
            vec![catalog(2, 1, 1), catalog(0, 1, 1), catalog(1, 1, 1)],
            vec![link(0, 1, 3), link(1, 2, 4)],
        )
        .unwrap()
    }

    #[test]
    fn modules_are_sorted_by_number() {
        let system = chain();
        let nums: Vec<_> = system.modules().iter().map(ModuleConfig::num).collect();
        assert_eq!(nums, [0, 1, 2]);
    }

    #[test]
    fn times_accumulate_along_a_chain() {
        // Each module runs for 10; the loose maximum is 3 * 10.
        let system = chain();

        let (min, max) = system.time_intervals();

        assert_eq!(min, [10 + 3, 10 + 3 + 10 + 4, 10 + 3 + 10 + 4 + 10]);
        assert_eq!(max, [30 + 3, 30 + 3 + 30 + 4, 30 + 3 + 30 + 4 + 30]);
    }

    #[test]
    fn propagation_takes_the_slowest_predecessor() {
        let system = SystemGraph::new(
            vec![catalog(0, 1, 1), catalog(1, 1, 1), catalog(2, 1, 1), catalog(3, 1, 1)],
            vec![link(0, 2, 1), link(1, 3, 50), link(2, 3, 1)],
        )
        .unwrap();

        let (min, _) = system.time_intervals();

        assert_eq!(min[2], (10 + 1) + 10 + 1);
        assert_eq!(min[3], (10 + 50) + 10);
    }

    #[test]
    fn traffic_and_neighbours_are_derived() {
        let system = SystemGraph::new(
            vec![catalog(0, 1, 1), catalog(1, 1, 1), catalog(2, 1, 1)],
            vec![link(0, 2, 5), link(1, 2, 7), link(0, 1, 2)],
        )
        .unwrap();

        let sink = system.module(2).unwrap();
        assert_eq!(sink.input(), 12);
        assert_eq!(sink.output(), 0);
        assert_eq!(sink.predecessors(), &BTreeSet::from([0, 1]));
        assert_eq!(system.module(0).unwrap().successors(), [(2, 5), (1, 2)]);
        assert_eq!(system.module(0).unwrap().output(), 7);
        assert_eq!(system.terminals(), [2]);
        assert_eq!(system.find_link(1, 2), Some(&link(1, 2, 7)));
        assert_eq!(system.find_link(2, 1), None);
    }

    #[test]
    fn dependencies_are_transitive() {
        let system = chain();

        assert!(system.module(0).unwrap().dependencies().is_empty());
        assert_eq!(system.module(1).unwrap().dependencies(), &BTreeSet::from([0]));
        assert_eq!(system.module(2).unwrap().dependencies(), &BTreeSet::from([0, 1]));
    }

    #[test]
    fn rejects_cycles() {
        let result = SystemGraph::new(
            vec![catalog(0, 1, 1), catalog(1, 1, 1), catalog(2, 1, 1)],
            vec![link(0, 1, 1), link(1, 2, 1), link(2, 1, 1)],
        );
        assert_eq!(result, Err(SystemError::Cycle(vec![1, 2])));

        let result = SystemGraph::new(vec![catalog(0, 1, 1)], vec![link(0, 0, 1)]);
        assert_eq!(result, Err(SystemError::Cycle(vec![0])));
    }

    #[test]
    fn rejects_gaps_and_unknown_endpoints() {
        assert_eq!(
            SystemGraph::new(vec![catalog(0, 1, 1), catalog(2, 1, 1)], vec![]),
            Err(SystemError::NonContiguous {
                position: 1,
                num: 2
            })
        );
        assert_eq!(
            SystemGraph::new(vec![catalog(0, 1, 1)], vec![link(0, 3, 1)]),
            Err(SystemError::UnknownModule(3))
        );
    }

    #[test]
    fn deadlines_require_every_module() {
        let with = |deadline| catalog(0, 1, 1).with_deadline(deadline);
        let system = SystemGraph::new(vec![with(Some(40))], vec![]).unwrap();
        assert_eq!(system.deadlines(), Some(vec![40]));

        let system = SystemGraph::new(
            vec![with(Some(40)), catalog(1, 1, 1)],
            vec![],
        )
        .unwrap();
        assert_eq!(system.deadlines(), None);
    }

    #[test]
    fn cost_interval_sums_modules() {
        let module = |num| catalog(num, 2, 3).with_schemes([SchemeKind::Simplex]);
        let system = SystemGraph::new(vec![module(0), module(1)], vec![]).unwrap();

        let (min, max) = module(0).cost_interval();
        assert_eq!(system.cost_interval(), (2 * min, 2 * max));
    }

    #[test]
    fn missing_mechanism_never_succeeds() {
        let system = chain();
        assert_eq!(system.mechanism(), None);
        assert_eq!(system.reconfiguration().reliability, Interval::point(0.0));
        assert_eq!(system.reconfiguration().cost, 0);
    }

    #[test]
    fn generated_systems_are_acyclic_and_sized() {
        let params = GenerationParams {
            modules: 6,
            link_probability: 0.5,
            min_volume: 1,
            max_volume: 9,
            ..GenerationParams::default()
        };
        let mut rng = StdRng::seed_from_u64(42);

        let system = SystemGraph::generate(&params, &mut rng).unwrap();

        assert_eq!(system.len(), 6);
        for link in system.links() {
            assert!(link.src < link.dst);
            assert!((1..=9).contains(&link.volume));
        }
        for module in system.modules() {
            assert_eq!(module.hardware().len(), params.hardware_variants);
            assert_eq!(module.software().len(), params.software_variants);
        }
    }
}
