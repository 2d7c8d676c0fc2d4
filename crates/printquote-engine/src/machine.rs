//! Machine profiles supplying bed geometry to the slicing engine.

use serde::{Deserialize, Serialize};

/// Build volume of a printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineProfile {
    /// Lookup key used in settings files.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Build volume X (mm).
    pub bed_x: f64,
    /// Build volume Y (mm).
    pub bed_y: f64,
    /// Build volume Z (mm).
    pub bed_z: f64,
    /// Is the bed heated?
    pub heated_bed: bool,
}

impl Default for MachineProfile {
    fn default() -> Self {
        Self::generic()
    }
}

impl MachineProfile {
    fn new(id: &str, name: &str, bed: [f64; 3], heated_bed: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bed_x: bed[0],
            bed_y: bed[1],
            bed_z: bed[2],
            heated_bed,
        }
    }

    /// Generic printer profile.
    pub fn generic() -> Self {
        Self::new("generic", "Generic", [220.0, 220.0, 250.0], true)
    }

    /// Creality Ender 3 profile.
    pub fn ender3() -> Self {
        Self::new("ender3", "Creality Ender 3", [220.0, 220.0, 250.0], true)
    }

    /// Prusa MK4 profile.
    pub fn prusa_mk4() -> Self {
        Self::new("prusa_mk4", "Prusa MK4", [250.0, 210.0, 220.0], true)
    }

    /// Bambu Lab X1 Carbon profile.
    pub fn bambu_x1c() -> Self {
        Self::new("bambu_x1c", "Bambu Lab X1 Carbon", [256.0, 256.0, 256.0], true)
    }

    /// Voron 2.4 profile.
    pub fn voron_24() -> Self {
        Self::new("voron_24", "Voron 2.4 (350mm)", [350.0, 350.0, 340.0], true)
    }

    /// Get all built-in profiles.
    pub fn all_profiles() -> Vec<Self> {
        vec![
            Self::generic(),
            Self::ender3(),
            Self::prusa_mk4(),
            Self::bambu_x1c(),
            Self::voron_24(),
        ]
    }

    /// Look up a built-in profile by id.
    pub fn by_id(id: &str) -> Option<Self> {
        Self::all_profiles().into_iter().find(|p| p.id == id)
    }

    /// Does a part of this height fit under the gantry?
    pub fn fits_height(&self, height_mm: f64) -> bool {
        height_mm <= self.bed_z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        for profile in MachineProfile::all_profiles() {
            assert!(profile.bed_x > 0.0);
            assert!(profile.bed_y > 0.0);
            assert!(profile.bed_z > 0.0);
            assert_eq!(MachineProfile::by_id(&profile.id), Some(profile.clone()));
        }
        assert!(MachineProfile::by_id("makerbot").is_none());
    }

    #[test]
    fn test_fits_height() {
        let profile = MachineProfile::prusa_mk4();
        assert!(profile.fits_height(220.0));
        assert!(!profile.fits_height(220.5));
    }
}
