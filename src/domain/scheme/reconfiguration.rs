use std::collections::BTreeSet;

use crate::domain::{
    Bound, Interval, ModuleConfig, Schedule,
    scheme::{EvaluationContext, Redundancy, SchemeKind},
};

/// One hardware unit running one software version, backed by the other
/// hardware-reconfiguration modules of its zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HardwareReconfiguration {
    hw: [usize; 1],
    sw: [usize; 1],
}

impl HardwareReconfiguration {
    pub(super) const fn new(hw: usize, sw: usize) -> Self {
        Self { hw: [hw], sw: [sw] }
    }
}

/// Average hardware failure of `peers` at one side, or certain failure when
/// there are none.
///
/// Each peer is judged by the hardware its own selection picked.
fn pool_failure(ctx: &EvaluationContext<'_>, peers: &[usize], bound: Bound) -> f64 {
    mean(peers.iter().map(|&peer| peer_hardware_failure(ctx, peer, bound))).unwrap_or(1.0)
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let count = values.len();
    (count > 0).then(|| values.sum::<f64>() / count as f64)
}

fn peer_hardware_failure(ctx: &EvaluationContext<'_>, peer: usize, bound: Bound) -> f64 {
    ctx.classification
        .hardware_reliability(ctx.system, peer)
        .map_or(1.0, |reliability| reliability.at(bound).p)
}

impl Redundancy for HardwareReconfiguration {
    fn kind(&self) -> SchemeKind {
        SchemeKind::HardwareReconfiguration
    }

    fn hardware(&self) -> &[usize] {
        &self.hw
    }

    fn software(&self) -> &[usize] {
        &self.sw
    }

    /// The own hardware fails over to a zone peer through the shared
    /// mechanism; that peer can in turn fail over to one of its own peers
    /// (other than this module). The result is scaled by the software
    /// reliability.
    ///
    /// The module's own selected hardware and software are used, not the
    /// first catalog entries.
    #[allow(clippy::suboptimal_flops, clippy::similar_names)]
    fn reliability(&self, ctx: &EvaluationContext<'_>) -> Interval {
        let own = ctx.module.num();
        let hardware = ctx.module.hardware()[self.hw[0]].reliability;
        let software = ctx.module.software()[self.sw[0]].reliability;
        let mechanism = ctx.system.reconfiguration().reliability;

        let first_level = ctx.classification.zone_peers(ctx.system, own, &BTreeSet::new());
        let second_level: Vec<(usize, Vec<usize>)> = first_level
            .iter()
            .map(|&peer| {
                let excluded = BTreeSet::from([own, peer]);
                (peer, ctx.classification.zone_peers(ctx.system, peer, &excluded))
            })
            .collect();

        Interval::from_failure_fn(|bound| {
            let m = mechanism.at(bound);
            let pool = mean(second_level.iter().map(|(peer, peers)| {
                peer_hardware_failure(ctx, *peer, bound)
                    * (m.p + m.q * pool_failure(ctx, peers, bound))
            }))
            .unwrap_or(1.0);

            hardware.at(bound).p * (m.p + m.q * pool)
        })
        .product(software)
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
