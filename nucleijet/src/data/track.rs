use std::f64::consts::TAU;

use jetcore::constants::{MASS_DEUTERON, MASS_HELIUM3, MASS_PROTON};
use jetcore::geometry::vector::Vector3;
use serde::{Deserialize, Serialize};

/// Number of ITS layers.
pub const ITS_LAYERS: usize = 7;

/// Nuclear species the analysis identifies.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Species {
    Proton,
    Deuteron,
    Helium3,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Proton, Species::Deuteron, Species::Helium3];

    pub fn mass(&self) -> f64 {
        match self {
            Species::Proton => MASS_PROTON,
            Species::Deuteron => MASS_DEUTERON,
            Species::Helium3 => MASS_HELIUM3,
        }
    }

    /// Absolute electric charge in units of e.
    pub fn charge(&self) -> f64 {
        match self {
            Species::Helium3 => 2.0,
            _ => 1.0,
        }
    }
}

/// One value per species, e.g. a set of nσ.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesValues {
    #[serde(default)]
    pub proton: f64,
    #[serde(default)]
    pub deuteron: f64,
    #[serde(default)]
    pub helium3: f64,
}

impl SpeciesValues {
    pub fn new(proton: f64, deuteron: f64, helium3: f64) -> Self {
        SpeciesValues { proton, deuteron, helium3 }
    }

    pub fn uniform(value: f64) -> Self {
        SpeciesValues::new(value, value, value)
    }

    pub fn get(&self, species: Species) -> f64 {
        match species {
            Species::Proton => self.proton,
            Species::Deuteron => self.deuteron,
            Species::Helium3 => self.helium3,
        }
    }
}

/// Read-only accessors the filters and the PID consume.
///
/// Anything that can be reduced to a reconstructed track implements this, so that
/// selections are written once for data and for simulation records.
pub trait TrackView {
    fn px(&self) -> f64;
    fn py(&self) -> f64;
    fn pz(&self) -> f64;
    /// Charge sign: -1, 0 or +1.
    fn sign(&self) -> i8;

    /// Cluster size per ITS layer, 0 where the layer has no hit.
    fn its_cluster_sizes(&self) -> [u8; ITS_LAYERS];
    fn its_chi2_ncl(&self) -> f64;
    fn tpc_n_cls_crossed_rows(&self) -> i32;
    fn tpc_n_cls_findable(&self) -> i32;
    fn tpc_chi2_ncl(&self) -> f64;
    fn has_tof(&self) -> bool;
    fn dca_xy(&self) -> f64;
    fn dca_z(&self) -> f64;
    fn is_pv_contributor(&self) -> bool;
    fn tpc_n_sigma(&self, species: Species) -> f64;
    fn tof_n_sigma(&self, species: Species) -> f64;
    /// Index of the associated generated particle within the same event.
    fn mc_particle_index(&self) -> Option<usize>;

    fn momentum(&self) -> Vector3 {
        Vector3::new(self.px(), self.py(), self.pz())
    }

    fn pt(&self) -> f64 {
        self.px().hypot(self.py())
    }

    fn p(&self) -> f64 {
        self.momentum().mag()
    }

    fn eta(&self) -> f64 {
        self.momentum().eta()
    }

    /// Azimuth in [0, 2pi).
    fn phi(&self) -> f64 {
        let phi = self.momentum().phi();
        if phi < 0.0 { phi + TAU } else { phi }
    }

    /// Tangent of the dip angle.
    fn tgl(&self) -> f64 {
        let pt = self.pt();
        if pt > 0.0 { self.pz() / pt } else { 0.0 }
    }

    /// Bit `l - 1` is set when ITS layer `l` has a hit.
    fn its_cluster_map(&self) -> u8 {
        self.its_cluster_sizes()
            .iter()
            .enumerate()
            .filter(|(_, size)| **size > 0)
            .fold(0u8, |map, (layer, _)| map | (1 << layer))
    }

    fn its_n_cls(&self) -> u8 {
        self.its_cluster_sizes().iter().filter(|size| **size > 0).count() as u8
    }

    /// `layer` counts from 1.
    fn has_its_hit(&self, layer: usize) -> bool {
        layer >= 1 && layer <= ITS_LAYERS && self.its_cluster_map() & (1 << (layer - 1)) != 0
    }

    fn has_its(&self) -> bool {
        self.its_cluster_map() != 0
    }

    fn has_tpc(&self) -> bool {
        self.tpc_n_cls_findable() > 0
    }

    fn tpc_crossed_rows_over_findable(&self) -> f64 {
        let findable = self.tpc_n_cls_findable();
        if findable > 0 {
            self.tpc_n_cls_crossed_rows() as f64 / findable as f64
        } else {
            0.0
        }
    }
}

/// Reconstructed charged-particle track as stored in the event files.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub sign: i8,
    #[serde(default)]
    pub its_cluster_sizes: [u8; ITS_LAYERS],
    #[serde(default)]
    pub its_chi2_ncl: f64,
    #[serde(default)]
    pub tpc_n_cls_crossed_rows: i32,
    #[serde(default)]
    pub tpc_n_cls_findable: i32,
    #[serde(default)]
    pub tpc_chi2_ncl: f64,
    #[serde(default)]
    pub has_tof: bool,
    #[serde(default)]
    pub dca_xy: f64,
    #[serde(default)]
    pub dca_z: f64,
    #[serde(default)]
    pub is_pv_contributor: bool,
    #[serde(default)]
    pub tpc_n_sigma: SpeciesValues,
    #[serde(default)]
    pub tof_n_sigma: SpeciesValues,
    #[serde(default)]
    pub mc_particle: Option<usize>,
}

impl TrackView for Track {
    fn px(&self) -> f64 {
        self.px
    }

    fn py(&self) -> f64 {
        self.py
    }

    fn pz(&self) -> f64 {
        self.pz
    }

    fn sign(&self) -> i8 {
        self.sign
    }

    fn its_cluster_sizes(&self) -> [u8; ITS_LAYERS] {
        self.its_cluster_sizes
    }

    fn its_chi2_ncl(&self) -> f64 {
        self.its_chi2_ncl
    }

    fn tpc_n_cls_crossed_rows(&self) -> i32 {
        self.tpc_n_cls_crossed_rows
    }

    fn tpc_n_cls_findable(&self) -> i32 {
        self.tpc_n_cls_findable
    }

    fn tpc_chi2_ncl(&self) -> f64 {
        self.tpc_chi2_ncl
    }

    fn has_tof(&self) -> bool {
        self.has_tof
    }

    fn dca_xy(&self) -> f64 {
        self.dca_xy
    }

    fn dca_z(&self) -> f64 {
        self.dca_z
    }

    fn is_pv_contributor(&self) -> bool {
        self.is_pv_contributor
    }

    fn tpc_n_sigma(&self, species: Species) -> f64 {
        self.tpc_n_sigma.get(species)
    }

    fn tof_n_sigma(&self, species: Species) -> f64 {
        self.tof_n_sigma.get(species)
    }

    fn mc_particle_index(&self) -> Option<usize> {
        self.mc_particle
    }
}

impl Track {
    /// Track with the given momentum, charge sign and a clean detector record
    /// that passes the standard quality selections.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleijet::data::track::{Track, TrackView};
    ///
    /// let track = Track::from_pt_eta_phi(1.0, 0.2, 0.5, -1);
    /// assert!((track.pt() - 1.0).abs() < 1e-12);
    /// assert_eq!(track.its_n_cls(), 7);
    /// ```
    pub fn from_pt_eta_phi(pt: f64, eta: f64, phi: f64, sign: i8) -> Self {
        Track {
            px: pt * phi.cos(),
            py: pt * phi.sin(),
            pz: pt * eta.sinh(),
            sign,
            its_cluster_sizes: [3; ITS_LAYERS],
            its_chi2_ncl: 1.0,
            tpc_n_cls_crossed_rows: 120,
            tpc_n_cls_findable: 130,
            tpc_chi2_ncl: 1.0,
            has_tof: false,
            dca_xy: 0.0,
            dca_z: 0.0,
            is_pv_contributor: true,
            tpc_n_sigma: SpeciesValues::default(),
            tof_n_sigma: SpeciesValues::default(),
            mc_particle: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kinematics_from_components() {
        let track = Track::from_pt_eta_phi(2.0, -0.4, 5.5, 1);
        assert_relative_eq!(track.pt(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(track.eta(), -0.4, epsilon = 1e-12);
        assert_relative_eq!(track.phi(), 5.5, epsilon = 1e-12);
    }

    #[test]
    fn test_its_hit_pattern() {
        let mut track = Track::from_pt_eta_phi(1.0, 0.0, 0.0, 1);
        track.its_cluster_sizes = [0, 0, 2, 0, 4, 4, 0];
        assert_eq!(track.its_cluster_map(), 0b0011_0100);
        assert_eq!(track.its_n_cls(), 3);
        assert!(!track.has_its_hit(1));
        assert!(track.has_its_hit(3));
        assert!(!track.has_its_hit(0));
        assert!(track.has_its());
    }

    #[test]
    fn test_missing_tpc() {
        let mut track = Track::from_pt_eta_phi(1.0, 0.0, 0.0, 1);
        track.tpc_n_cls_findable = 0;
        assert!(!track.has_tpc());
        assert_eq!(track.tpc_crossed_rows_over_findable(), 0.0);
    }
}
