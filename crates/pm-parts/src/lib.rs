//! Parametric Part Recipes
//!
//! Each recipe turns a small set of numeric design parameters into finished
//! solids using only the `pm-cad` core. Hosts pick a part by its kebab-case
//! name and pass a flat JSON parameter map; missing keys take the documented
//! defaults and unknown keys are rejected.

pub mod constants;
mod error;
pub mod recipes;

use std::fmt;
use std::str::FromStr;

use pm_cad::{Modeler, Solid};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use error::{PartError, PartResult};
pub use recipes::{
    Beam, Bracket, Container, CupHolder, CuttingJig, DowelHolder, Hinge, Hook, ThreadedFastener,
};

/// The parts this crate can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartKind {
    Beam,
    Bracket,
    Container,
    CupHolder,
    CuttingJig,
    DowelHolder,
    Hinge,
    Hook,
    ThreadedFastener,
}

impl PartKind {
    pub const ALL: [PartKind; 9] = [
        PartKind::Beam,
        PartKind::Bracket,
        PartKind::Container,
        PartKind::CupHolder,
        PartKind::CuttingJig,
        PartKind::DowelHolder,
        PartKind::Hinge,
        PartKind::Hook,
        PartKind::ThreadedFastener,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PartKind::Beam => "beam",
            PartKind::Bracket => "bracket",
            PartKind::Container => "container",
            PartKind::CupHolder => "cup-holder",
            PartKind::CuttingJig => "cutting-jig",
            PartKind::DowelHolder => "dowel-holder",
            PartKind::Hinge => "hinge",
            PartKind::Hook => "hook",
            PartKind::ThreadedFastener => "threaded-fastener",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PartKind {
    type Err = PartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PartError::UnknownPart(s.to_string()))
    }
}

/// One named solid of a finished part
#[derive(Debug)]
pub struct PartBody {
    pub name: String,
    pub solid: Solid,
    /// Display colour (RGBA) when the part has several bodies
    pub color: Option<[f32; 4]>,
}

/// Bodies produced by a recipe, in order
#[derive(Debug)]
pub struct PartOutput {
    bodies: Vec<PartBody>,
}

impl PartOutput {
    pub fn new(bodies: Vec<PartBody>) -> Self {
        Self { bodies }
    }

    /// A part made of one uncoloured body
    pub fn single(name: impl Into<String>, solid: Solid) -> Self {
        Self::new(vec![PartBody {
            name: name.into(),
            solid,
            color: None,
        }])
    }

    pub fn bodies(&self) -> &[PartBody] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn into_bodies(self) -> Vec<PartBody> {
        self.bodies
    }

    /// The only body, if there is exactly one
    pub fn into_single(self) -> Option<Solid> {
        let mut bodies = self.bodies;
        if bodies.len() == 1 {
            bodies.pop().map(|body| body.solid)
        } else {
            None
        }
    }
}

/// A part recipe with its parameter schema
pub trait Recipe {
    const KIND: PartKind;

    /// Parameters with their documented defaults
    type Params: DeserializeOwned + Default;

    fn build(modeler: &Modeler, params: &Self::Params) -> PartResult<PartOutput>;

    /// Decode a flat parameter map
    fn decode(params: &Map<String, Value>) -> PartResult<Self::Params> {
        Ok(serde_json::from_value(Value::Object(params.clone()))?)
    }
}

/// Build `kind` from a flat JSON parameter map
pub fn build_part(
    kind: PartKind,
    params: &Map<String, Value>,
    modeler: &Modeler,
) -> PartResult<PartOutput> {
    tracing::debug!(part = %kind, keys = params.len(), "building part");
    let output = match kind {
        PartKind::Beam => run::<Beam>(params, modeler),
        PartKind::Bracket => run::<Bracket>(params, modeler),
        PartKind::Container => run::<Container>(params, modeler),
        PartKind::CupHolder => run::<CupHolder>(params, modeler),
        PartKind::CuttingJig => run::<CuttingJig>(params, modeler),
        PartKind::DowelHolder => run::<DowelHolder>(params, modeler),
        PartKind::Hinge => run::<Hinge>(params, modeler),
        PartKind::Hook => run::<Hook>(params, modeler),
        PartKind::ThreadedFastener => run::<ThreadedFastener>(params, modeler),
    };
    if let Err(e) = &output {
        tracing::warn!(part = %kind, "part failed: {e}");
    }
    output
}

/// Build a part given its kebab-case name
pub fn build_part_named(
    name: &str,
    params: &Map<String, Value>,
    modeler: &Modeler,
) -> PartResult<PartOutput> {
    build_part(name.parse()?, params, modeler)
}

fn run<R: Recipe>(params: &Map<String, Value>, modeler: &Modeler) -> PartResult<PartOutput> {
    let params = R::decode(params)?;
    R::build(modeler, &params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_names_round_trip() {
        for kind in PartKind::ALL {
            assert_eq!(kind.name().parse::<PartKind>().unwrap(), kind);
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, Value::String(kind.name().to_string()));
        }
    }

    #[test]
    fn test_unknown_part_name() {
        assert!(matches!(
            "gear".parse::<PartKind>(),
            Err(PartError::UnknownPart(name)) if name == "gear"
        ));
    }

    #[test]
    fn test_unknown_parameter_key_is_rejected() {
        let mut params = Map::new();
        params.insert("lengthInGu".into(), Value::from(1));
        params.insert("colour".into(), Value::from("red"));
        let err = CuttingJig::decode(&params).unwrap_err();
        assert!(matches!(err, PartError::InvalidParams(_)));
    }

    #[test]
    fn test_build_part_from_a_parameter_map() {
        let mut params = Map::new();
        params.insert("lengthInGu".into(), Value::from(3));
        let output = build_part_named("cutting-jig", &params, &Modeler::new()).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output.bodies()[0].name, "cutting-jig");

        let jig = output.into_single().unwrap();
        let size = jig.bounding_box().unwrap().size();
        assert!((size.x - 119.365).abs() < 1e-9);
    }

    #[test]
    fn test_build_part_reports_bad_parameters() {
        let mut params = Map::new();
        params.insert("diameter".into(), Value::from(9.5));
        let err = build_part(PartKind::ThreadedFastener, &params, &Modeler::new()).unwrap_err();
        assert!(matches!(err, PartError::InvalidParameter { name: "diameter", .. }));
    }
}
