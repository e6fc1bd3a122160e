use std::f64::consts::TAU;

use jetcore::geometry::vector::Vector3;
use serde::{Deserialize, Serialize};

/// Generated (truth) particle of a simulated event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct McParticle {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub pdg_code: i32,
    #[serde(default)]
    pub is_physical_primary: bool,
}

impl McParticle {
    pub fn new(px: f64, py: f64, pz: f64, pdg_code: i32, is_physical_primary: bool) -> Self {
        McParticle { px, py, pz, pdg_code, is_physical_primary }
    }

    pub fn from_pt_eta_phi(pt: f64, eta: f64, phi: f64, pdg_code: i32, is_physical_primary: bool) -> Self {
        McParticle::new(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh(), pdg_code, is_physical_primary)
    }

    pub fn momentum(&self) -> Vector3 {
        Vector3::new(self.px, self.py, self.pz)
    }

    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    pub fn p(&self) -> f64 {
        self.momentum().mag()
    }

    pub fn eta(&self) -> f64 {
        self.momentum().eta()
    }

    pub fn phi(&self) -> f64 {
        let phi = self.momentum().phi();
        if phi < 0.0 { phi + TAU } else { phi }
    }
}
