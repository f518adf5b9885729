use std::{collections::BTreeSet, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::domain::{FaultModel, Interval, Overheads, ReconfigurationMechanism, SchemeKind};

/// Parameters for generating a random system.
///
/// Loaded from a TOML file. The on-disk keys follow the historical
/// generator format (`minrel`, `qrvL`, `nvp11`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct GenerationParams {
    /// Schemes every generated module declares.
    pub schemes: BTreeSet<SchemeKind>,

    /// Lower end of the component reliability range.
    pub min_rel: f64,
    /// Upper end of the component reliability range.
    pub max_rel: f64,

    /// Lower end of the component cost range.
    pub min_cost: u64,
    /// Upper end of the component cost range.
    pub max_cost: u64,

    /// Lower end of the execution time range for each matrix cell.
    pub min_time: u64,
    /// Upper end of the execution time range for each matrix cell.
    pub max_time: u64,

    /// Fault-model probability bounds applied to every module.
    pub fault: FaultModel,

    /// Fixed vote/test/recovery durations applied to every module.
    pub overheads: Overheads,

    /// Reconfiguration zone assigned to every module, if any.
    pub zone: Option<u32>,

    /// Number of modules.
    pub modules: usize,

    /// Probability of a link between modules `i < j`.
    pub link_probability: f64,

    /// Lower end of the link volume range.
    pub min_volume: u64,
    /// Upper end of the link volume range.
    pub max_volume: u64,

    /// Number of software variants per module.
    pub software_variants: usize,
    /// Number of hardware variants per module.
    pub hardware_variants: usize,

    /// Global cost budget written to the generated system.
    pub limit_cost: Option<u64>,

    /// Reconfiguration mechanism written to the generated system.
    pub reconfiguration: Option<ReconfigurationMechanism>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            schemes: BTreeSet::from([SchemeKind::Simplex]),
            min_rel: 0.9,
            max_rel: 0.99,
            min_cost: 1,
            max_cost: 10,
            min_time: 1,
            max_time: 10,
            fault: FaultModel::default(),
            overheads: Overheads::default(),
            zone: None,
            modules: 1,
            link_probability: 0.0,
            min_volume: 0,
            max_volume: 0,
            software_variants: 3,
            hardware_variants: 2,
            limit_cost: None,
            reconfiguration: None,
        }
    }
}

/// Errors raised while reading or writing generation parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[source] io::Error),
    /// The file is not valid TOML or is missing required keys.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The parameters could not be serialized.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// The file could not be written.
    #[error("Failed to write config file: {0}")]
    Write(#[source] io::Error),
}

impl GenerationParams {
    /// Loads the parameters from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Ok(toml::from_str(&content)?)
    }

    /// Saves the parameters to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }
}

const fn one() -> f64 {
    1.0
}

/// The serialized versions of the generation parameters.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        none: bool,
        #[serde(default)]
        nvp01: bool,
        #[serde(default)]
        nvp11: bool,
        #[serde(default)]
        rb11: bool,
        #[serde(default)]
        hwrc20: bool,

        minrel: f64,
        maxrel: f64,
        mincost: u64,
        maxcost: u64,
        mintime: u64,
        maxtime: u64,

        #[serde(rename = "qrvL", default = "one")]
        qrv_l: f64,
        #[serde(rename = "qrvR", default = "one")]
        qrv_r: f64,
        #[serde(rename = "qdL", default = "one")]
        qd_l: f64,
        #[serde(rename = "qdR", default = "one")]
        qd_r: f64,
        #[serde(rename = "qallL", default = "one")]
        qall_l: f64,
        #[serde(rename = "qallR", default = "one")]
        qall_r: f64,

        #[serde(default)]
        tvote: u64,
        #[serde(default)]
        ttest: u64,
        #[serde(default)]
        trecov: u64,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        hwrczonenum: Option<u32>,

        modnum: usize,
        #[serde(default)]
        linkprob: f64,
        #[serde(default)]
        minvol: u64,
        #[serde(default)]
        maxvol: u64,

        swnum: usize,
        hwnum: usize,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        limitcost: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        costhwrc: Option<u64>,
        #[serde(rename = "qhwrcL", default, skip_serializing_if = "Option::is_none")]
        qhwrc_l: Option<f64>,
        #[serde(rename = "qhwrcR", default, skip_serializing_if = "Option::is_none")]
        qhwrc_r: Option<f64>,
    },
}

impl From<Versions> for GenerationParams {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                none,
                nvp01,
                nvp11,
                rb11,
                hwrc20,
                minrel,
                maxrel,
                mincost,
                maxcost,
                mintime,
                maxtime,
                qrv_l,
                qrv_r,
                qd_l,
                qd_r,
                qall_l,
                qall_r,
                tvote,
                ttest,
                trecov,
                hwrczonenum,
                modnum,
                linkprob,
                minvol,
                maxvol,
                swnum,
                hwnum,
                limitcost,
                costhwrc,
                qhwrc_l,
                qhwrc_r,
            } => {
                let schemes = [
                    (none, SchemeKind::Simplex),
                    (nvp01, SchemeKind::NvpSingle),
                    (nvp11, SchemeKind::NvpTriple),
                    (rb11, SchemeKind::RecoveryBlock),
                    (hwrc20, SchemeKind::HardwareReconfiguration),
                ]
                .into_iter()
                .filter_map(|(enabled, kind)| enabled.then_some(kind))
                .collect();

                let reconfiguration = match (qhwrc_l, qhwrc_r) {
                    (Some(lower), Some(upper)) => Some(ReconfigurationMechanism {
                        reliability: Interval::new(lower, upper),
                        cost: costhwrc.unwrap_or_default(),
                    }),
                    _ => None,
                };

                Self {
                    schemes,
                    min_rel: minrel,
                    max_rel: maxrel,
                    min_cost: mincost,
                    max_cost: maxcost,
                    min_time: mintime,
                    max_time: maxtime,
                    fault: FaultModel {
                        qrv: Interval::new(qrv_l, qrv_r),
                        qd: Interval::new(qd_l, qd_r),
                        qall: Interval::new(qall_l, qall_r),
                    },
                    overheads: Overheads {
                        vote: tvote,
                        test: ttest,
                        recovery: trecov,
                    },
                    zone: hwrczonenum,
                    modules: modnum,
                    link_probability: linkprob,
                    min_volume: minvol,
                    max_volume: maxvol,
                    software_variants: swnum,
                    hardware_variants: hwnum,
                    limit_cost: limitcost,
                    reconfiguration,
                }
            }
        }
    }
}

impl From<GenerationParams> for Versions {
    fn from(params: GenerationParams) -> Self {
        let enabled = |kind| params.schemes.contains(&kind);
        Self::V1 {
            none: enabled(SchemeKind::Simplex),
            nvp01: enabled(SchemeKind::NvpSingle),
            nvp11: enabled(SchemeKind::NvpTriple),
            rb11: enabled(SchemeKind::RecoveryBlock),
            hwrc20: enabled(SchemeKind::HardwareReconfiguration),
            minrel: params.min_rel,
            maxrel: params.max_rel,
            mincost: params.min_cost,
            maxcost: params.max_cost,
            mintime: params.min_time,
            maxtime: params.max_time,
            qrv_l: params.fault.qrv.lower,
            qrv_r: params.fault.qrv.upper,
            qd_l: params.fault.qd.lower,
            qd_r: params.fault.qd.upper,
            qall_l: params.fault.qall.lower,
            qall_r: params.fault.qall.upper,
            tvote: params.overheads.vote,
            ttest: params.overheads.test,
            trecov: params.overheads.recovery,
            hwrczonenum: params.zone,
            modnum: params.modules,
            linkprob: params.link_probability,
            minvol: params.min_volume,
            maxvol: params.max_volume,
            swnum: params.software_variants,
            hwnum: params.hardware_variants,
            limitcost: params.limit_cost,
            costhwrc: params.reconfiguration.map(|mechanism| mechanism.cost),
            qhwrc_l: params
                .reconfiguration
                .map(|mechanism| mechanism.reliability.lower),
            qhwrc_r: params
                .reconfiguration
                .map(|mechanism| mechanism.reliability.upper),
        }
    }
}
