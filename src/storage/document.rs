//! XML system documents.
//!
//! ```xml
//! <system limitcost="100" costhwrc="5" qhwrcL="0.9" qhwrcR="0.95">
//!   <module num="0" qrvL="1" qdL="1" qallL="1" qrvR="1" qdR="1" qallR="1"
//!           tvote="1" ttest="1" trecov="1" hwrczonenum="0" limittime="40">
//!     <tool name="none"/>
//!     <sw num="0" cost="5" relL="0.8" relR="0.85"/>
//!     <hw num="0" cost="10" relL="0.9" relR="0.95"/>
//!     <time swnum="0" hwnum="0" t="7"/>
//!   </module>
//!   <link src="0" dst="1" vol="3"/>
//! </system>
//! ```
//!
//! `swnum`/`hwnum` of a `time` element are positions in the variant lists
//! sorted by `num`, not variant numbers.

use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    str::FromStr,
};

use roxmltree::Node;
use tracing::{debug, instrument};

use crate::domain::{
    CatalogError, Component, FaultModel, Interval, Link, ModuleConfig, Overheads,
    ReconfigurationMechanism, SchemeKind, SystemError, SystemGraph, UnknownSchemeError,
};

/// Errors that can occur when loading a system document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// An I/O error occurred.
    #[error("failed to read system document")]
    Io(#[from] io::Error),
    /// The text is not well-formed XML.
    #[error("malformed XML")]
    Xml(#[from] roxmltree::Error),
    /// The root element is not `<system>`.
    #[error("expected root element <system>, found <{0}>")]
    Root(String),
    /// A required attribute is absent.
    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        /// Element name.
        element: &'static str,
        /// Attribute name.
        attribute: &'static str,
    },
    /// An attribute value does not parse.
    #[error("<{element}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        /// Element name.
        element: &'static str,
        /// Attribute name.
        attribute: &'static str,
        /// The raw value.
        value: String,
    },
    /// A `tool` names an unknown scheme.
    #[error(transparent)]
    UnknownScheme(#[from] UnknownSchemeError),
    /// A `time` element addresses a cell outside the matrix.
    #[error("module {module}: time cell ({sw}, {hw}) is out of range")]
    TimeOutOfRange {
        /// Module number.
        module: usize,
        /// Software position.
        sw: usize,
        /// Hardware position.
        hw: usize,
    },
    /// A matrix cell has no `time` element.
    #[error("module {module}: no time given for software {sw} on hardware {hw}")]
    MissingTime {
        /// Module number.
        module: usize,
        /// Software position.
        sw: usize,
        /// Hardware position.
        hw: usize,
    },
    /// A module catalog is invalid.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The system graph is invalid.
    #[error(transparent)]
    System(#[from] SystemError),
}

/// Reads a system document from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not describe a valid
/// system.
#[instrument(level = "debug")]
pub fn load(path: &Path) -> Result<SystemGraph, DocumentError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parses a system document.
///
/// # Errors
///
/// Returns an error if the text is not a valid system document.
pub fn parse(text: &str) -> Result<SystemGraph, DocumentError> {
    let document = roxmltree::Document::parse(text)?;
    let root = document.root_element();
    if root.tag_name().name() != "system" {
        return Err(DocumentError::Root(root.tag_name().name().to_string()));
    }

    let mut modules = Vec::new();
    let mut links = Vec::new();
    for node in root.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "module" => modules.push(parse_module(node)?),
            "link" => links.push(Link {
                src: required(node, "link", "src")?,
                dst: required(node, "link", "dst")?,
                volume: required(node, "link", "vol")?,
            }),
            other => debug!(element = other, "ignoring unknown element"),
        }
    }

    let mut system = SystemGraph::new(modules, links)?
        .with_limit_cost(optional(root, "system", "limitcost")?)
        .with_limit_rel(optional(root, "system", "limitrel")?);

    let cost = optional(root, "system", "costhwrc")?;
    let lower = optional(root, "system", "qhwrcL")?;
    let upper = optional(root, "system", "qhwrcR")?;
    if cost.is_some() || lower.is_some() || upper.is_some() {
        system = system.with_reconfiguration(ReconfigurationMechanism {
            reliability: Interval::new(lower.unwrap_or_default(), upper.unwrap_or_default()),
            cost: cost.unwrap_or_default(),
        });
    }

    debug!(modules = system.len(), links = system.links().len(), "loaded system");
    Ok(system)
}

fn parse_module(node: Node<'_, '_>) -> Result<ModuleConfig, DocumentError> {
    const ELEMENT: &str = "module";
    let num: usize = required(node, ELEMENT, "num")?;
    let fault = FaultModel {
        qrv: Interval::new(
            required(node, ELEMENT, "qrvL")?,
            required(node, ELEMENT, "qrvR")?,
        ),
        qd: Interval::new(
            required(node, ELEMENT, "qdL")?,
            required(node, ELEMENT, "qdR")?,
        ),
        qall: Interval::new(
            required(node, ELEMENT, "qallL")?,
            required(node, ELEMENT, "qallR")?,
        ),
    };
    let overheads = Overheads {
        vote: optional(node, ELEMENT, "tvote")?.unwrap_or_default(),
        test: optional(node, ELEMENT, "ttest")?.unwrap_or_default(),
        recovery: optional(node, ELEMENT, "trecov")?.unwrap_or_default(),
    };
    let zone = zone(node)?;
    let deadline = optional(node, ELEMENT, "limittime")?;

    let mut schemes = Vec::new();
    let mut software = Vec::new();
    let mut hardware = Vec::new();
    let mut cells = Vec::new();
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "tool" => {
                let name: String = required(child, "tool", "name")?;
                schemes.push(SchemeKind::from_str(&name)?);
            }
            "sw" => software.push(parse_component(child, "sw")?),
            "hw" => hardware.push(parse_component(child, "hw")?),
            "time" => cells.push((
                required::<usize>(child, "time", "swnum")?,
                required::<usize>(child, "time", "hwnum")?,
                required::<u64>(child, "time", "t")?,
            )),
            other => debug!(element = other, module = num, "ignoring unknown element"),
        }
    }

    let mut times = vec![vec![None; hardware.len()]; software.len()];
    for (sw, hw, t) in cells {
        let cell = times
            .get_mut(sw)
            .and_then(|row| row.get_mut(hw))
            .ok_or(DocumentError::TimeOutOfRange { module: num, sw, hw })?;
        *cell = Some(t);
    }
    let times = times
        .into_iter()
        .enumerate()
        .map(|(sw, row)| {
            row.into_iter()
                .enumerate()
                .map(|(hw, cell)| cell.ok_or(DocumentError::MissingTime { module: num, sw, hw }))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModuleConfig::new(num, hardware, software, times)?
        .with_fault_model(fault)
        .with_overheads(overheads)
        .with_zone(zone)
        .with_deadline(deadline)
        .with_schemes(schemes))
}

fn parse_component(node: Node<'_, '_>, element: &'static str) -> Result<Component, DocumentError> {
    Ok(Component::new(
        required(node, element, "num")?,
        Interval::new(
            required(node, element, "relL")?,
            required(node, element, "relR")?,
        ),
        required(node, element, "cost")?,
    ))
}

/// Zone keys are integers, but older documents write them as `2.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn zone(node: Node<'_, '_>) -> Result<Option<u32>, DocumentError> {
    let Some(value) = node.attribute("hwrczonenum") else {
        return Ok(None);
    };
    if let Ok(zone) = value.parse() {
        return Ok(Some(zone));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|zone| zone.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(zone))
        .map(|zone| Some(zone as u32))
        .ok_or_else(|| DocumentError::InvalidAttribute {
            element: "module",
            attribute: "hwrczonenum",
            value: value.to_string(),
        })
}

fn required<T: FromStr>(
    node: Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<T, DocumentError> {
    optional(node, element, attribute)?.ok_or(DocumentError::MissingAttribute { element, attribute })
}

fn optional<T: FromStr>(
    node: Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<Option<T>, DocumentError> {
    node.attribute(attribute)
        .map(|value| {
            value.trim().parse().map_err(|_| DocumentError::InvalidAttribute {
                element,
                attribute,
                value: value.to_string(),
            })
        })
        .transpose()
}

/// Renders a system as a document.
///
/// Modules and variants come out sorted by number, with exactly one `time`
/// element per matrix cell. Floats use the shortest representation that
/// parses back to the same value.
#[derive(Debug, Clone, Copy)]
pub struct Document<'a>(pub &'a SystemGraph);

impl fmt::Display for Document<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let system = self.0;
        writeln!(f, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
        write!(f, "<system")?;
        if let Some(limit) = system.limit_cost() {
            write!(f, r#" limitcost="{limit}""#)?;
        }
        if let Some(limit) = system.limit_rel() {
            write!(f, r#" limitrel="{limit}""#)?;
        }
        if let Some(mechanism) = system.mechanism() {
            write!(
                f,
                r#" costhwrc="{}" qhwrcL="{}" qhwrcR="{}""#,
                mechanism.cost, mechanism.reliability.lower, mechanism.reliability.upper
            )?;
        }
        writeln!(f, ">")?;

        for module in system.modules() {
            write_module(f, module)?;
        }
        for link in system.links() {
            writeln!(
                f,
                r#"  <link src="{}" dst="{}" vol="{}"/>"#,
                link.src, link.dst, link.volume
            )?;
        }
        writeln!(f, "</system>")
    }
}

fn write_module(f: &mut fmt::Formatter<'_>, module: &ModuleConfig) -> fmt::Result {
    let FaultModel { qrv, qd, qall } = module.fault;
    write!(
        f,
        r#"  <module num="{}" qrvL="{}" qdL="{}" qallL="{}" qrvR="{}" qdR="{}" qallR="{}" tvote="{}" ttest="{}" trecov="{}""#,
        module.num(),
        qrv.lower,
        qd.lower,
        qall.lower,
        qrv.upper,
        qd.upper,
        qall.upper,
        module.overheads.vote,
        module.overheads.test,
        module.overheads.recovery,
    )?;
    if let Some(zone) = module.zone {
        write!(f, r#" hwrczonenum="{zone}""#)?;
    }
    if let Some(deadline) = module.deadline {
        write!(f, r#" limittime="{deadline}""#)?;
    }
    writeln!(f, ">")?;

    for kind in module.schemes() {
        writeln!(f, r#"    <tool name="{kind}"/>"#)?;
    }
    for (element, variants) in [("sw", module.software()), ("hw", module.hardware())] {
        for variant in variants {
            writeln!(
                f,
                r#"    <{element} num="{}" cost="{}" relL="{}" relR="{}"/>"#,
                variant.num, variant.cost, variant.reliability.lower, variant.reliability.upper
            )?;
        }
    }
    for (sw, row) in module.times().iter().enumerate() {
        for (hw, t) in row.iter().enumerate() {
            writeln!(f, r#"    <time swnum="{sw}" hwnum="{hw}" t="{t}"/>"#)?;
        }
    }
    writeln!(f, "  </module>")
}

/// Writes a system document to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
#[instrument(level = "debug", skip(system))]
pub fn save(system: &SystemGraph, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write!(writer, "{}", Document(system))?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<system limitcost="120" costhwrc="5" qhwrcL="0.9" qhwrcR="0.95">
  <module num="1" qrvL="0.9" qdL="0.95" qallL="0.97" qrvR="0.92" qdR="0.96" qallR="0.98"
          tvote="1" ttest="2" trecov="3" hwrczonenum="2.0" limittime="80">
    <tool name="none"/>
    <tool name="rb11"/>
    <sw num="7" cost="5" relL="0.8" relR="0.85"/>
    <sw num="3" cost="4" relL="0.7" relR="0.75"/>
    <hw num="0" cost="10" relL="0.9" relR="0.95"/>
    <time swnum="0" hwnum="0" t="11"/>
    <time swnum="1" hwnum="0" t="12"/>
  </module>
  <module num="0" qrvL="1" qdL="1" qallL="1" qrvR="1" qdR="1" qallR="1">
    <tool name="hwrc20"/>
    <sw num="0" cost="1" relL="0.5" relR="0.6"/>
    <hw num="0" cost="2" relL="0.7" relR="0.8"/>
    <time swnum="0" hwnum="0" t="4"/>
  </module>
  <link src="0" dst="1" vol="6"/>
</system>
"#;

    #[test]
    fn parses_sample() {
        let system = parse(SAMPLE).unwrap();

        assert_eq!(system.len(), 2);
        assert_eq!(system.limit_cost(), Some(120));
        assert_eq!(
            system.mechanism(),
            Some(ReconfigurationMechanism {
                reliability: Interval::new(0.9, 0.95),
                cost: 5
            })
        );

        let module = system.module(1).unwrap();
        assert_eq!(module.schemes(), [SchemeKind::Simplex, SchemeKind::RecoveryBlock]);
        assert_eq!(module.zone, Some(2));
        assert_eq!(module.deadline, Some(80));
        assert_eq!(
            module.overheads,
            Overheads {
                vote: 1,
                test: 2,
                recovery: 3
            }
        );
        // Software is sorted by number; the matrix is addressed by position.
        assert_eq!(module.software()[0].num, 3);
        assert_eq!(module.time(0, 0), 11);
        assert_eq!(module.input(), 6);
        assert_eq!(system.module(0).unwrap().overheads, Overheads::default());
    }

    #[test]
    fn round_trips_through_a_file() {
        let system = parse(SAMPLE).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("system.xml");

        save(&system, &path).unwrap();
        let reloaded = load(&path).unwrap();

        assert_eq!(reloaded, system);
        assert_eq!(Document(&reloaded).to_string(), Document(&system).to_string());
    }

    #[test]
    fn round_trip_preserves_awkward_floats() {
        let text = SAMPLE.replace(r#"relL="0.8""#, r#"relL="0.1234567890123456789""#);
        let system = parse(&text).unwrap();

        let reloaded = parse(&Document(&system).to_string()).unwrap();

        assert_eq!(reloaded, system);
    }

    #[test]
    fn missing_required_attribute_is_fatal() {
        let text = SAMPLE.replace(r#"qdL="0.95" "#, "");
        let err = parse(&text).unwrap_err();
        assert!(
            matches!(
                err,
                DocumentError::MissingAttribute {
                    element: "module",
                    attribute: "qdL"
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn invalid_attribute_is_fatal() {
        let text = SAMPLE.replace(r#"cost="10""#, r#"cost="ten""#);
        let err = parse(&text).unwrap_err();
        assert!(
            matches!(err, DocumentError::InvalidAttribute { element: "hw", attribute: "cost", .. }),
            "{err}"
        );
    }

    #[test]
    fn unknown_tool_is_fatal() {
        let text = SAMPLE.replace(r#"name="rb11""#, r#"name="tmr""#);
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownScheme(_)), "{err}");
    }

    #[test]
    fn incomplete_time_matrix_is_fatal() {
        let text = SAMPLE.replace(r#"<time swnum="1" hwnum="0" t="12"/>"#, "");
        let err = parse(&text).unwrap_err();
        assert!(
            matches!(err, DocumentError::MissingTime { module: 1, sw: 1, hw: 0 }),
            "{err}"
        );

        let text = SAMPLE.replace(r#"swnum="1" hwnum="0""#, r#"swnum="1" hwnum="4""#);
        let err = parse(&text).unwrap_err();
        assert!(
            matches!(err, DocumentError::TimeOutOfRange { module: 1, sw: 1, hw: 4 }),
            "{err}"
        );
    }

    #[test]
    fn cyclic_links_are_rejected() {
        let text = SAMPLE.replace(
            r#"<link src="0" dst="1" vol="6"/>"#,
            r#"<link src="0" dst="1" vol="6"/><link src="1" dst="0" vol="1"/>"#,
        );
        let err = parse(&text).unwrap_err();
        assert!(
            matches!(err, DocumentError::System(SystemError::Cycle(_))),
            "{err}"
        );
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = parse("<systems/>").unwrap_err();
        assert!(matches!(err, DocumentError::Root(ref name) if name == "systems"), "{err}");
    }
}
