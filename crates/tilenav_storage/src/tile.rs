/// Applies one `update` to a value: `v * m + a`, except that a zero multiplier resets an infinite value instead of producing
/// NaN.
#[inline]
pub fn compose(v: f32, m: f32, a: f32) -> f32 {
    let scaled = if m == 0.0 && v.is_infinite() {
        0.0
    } else {
        v * m
    };

    scaled + a
}

/// The updates a store has applied to one tile since its last commit, folded into a single multiply-then-add per cell.
///
/// Replaying the delta on top of a newer base is how concurrent writers merge: the base reflects everybody else's commits,
/// and the delta reflects ours.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingDelta {
    pub multiplication: Vec<f32>,
    pub addition: Vec<f32>,
}

impl PendingDelta {
    /// The delta that changes nothing.
    pub fn identity(len: usize) -> Self {
        Self {
            multiplication: vec![1.0; len],
            addition: vec![0.0; len],
        }
    }

    /// The delta that replaces every cell with `data`.
    pub fn overwrite(data: &[f32]) -> Self {
        Self {
            multiplication: vec![0.0; data.len()],
            addition: data.to_vec(),
        }
    }

    /// Folds `v * m + a` at cell `index` into the delta.
    #[inline]
    pub fn record(&mut self, index: usize, m: f32, a: f32) {
        debug_assert!(m.is_finite(), "multiplier must be finite");

        self.multiplication[index] *= m;
        self.addition[index] = compose(self.addition[index], m, a);
    }

    /// Replays the delta onto `base`.
    pub fn apply_to(&self, base: &mut [f32]) {
        for ((v, m), a) in base
            .iter_mut()
            .zip(self.multiplication.iter())
            .zip(self.addition.iter())
        {
            *v = compose(*v, *m, *a);
        }
    }
}

/// A resident tile of a `TileStore`.
#[derive(Clone, Debug, Default)]
pub struct CachedTile {
    /// `None` until the tile is loaded or first written. Reads of an absent tile return the channel default.
    pub data: Option<Vec<f32>>,
    /// `Some` iff the tile is dirty.
    pub delta: Option<PendingDelta>,
    /// The last revision seen in the backend, 0 if the tile was never seen there.
    pub revision: u32,
    /// Set by `TileStore::refresh`; the next access checks the backend for a newer revision.
    pub stale: bool,
}

impl CachedTile {
    pub fn is_dirty(&self) -> bool {
        self.delta.is_some() && self.data.is_some()
    }

    /// Applies `v * m + a` at cell `index`, filling the tile with `default` first if it has no data.
    pub fn update(&mut self, len: usize, default: f32, index: usize, m: f32, a: f32) {
        let data = self.data.get_or_insert_with(|| vec![default; len]);
        data[index] = compose(data[index], m, a);

        self.delta
            .get_or_insert_with(|| PendingDelta::identity(len))
            .record(index, m, a);
    }

    /// Accepts a newer base from the backend, replaying any pending delta on top.
    pub fn rebase(&mut self, mut data: Vec<f32>, revision: u32) {
        if let Some(delta) = &self.delta {
            delta.apply_to(&mut data);
        }
        self.data = Some(data);
        self.revision = revision;
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_multiplier_resets_infinity() {
        assert_eq!(compose(f32::INFINITY, 0.0, 2.0), 2.0);
        assert_eq!(compose(f32::NEG_INFINITY, 0.0, 0.0), 0.0);
        assert_eq!(compose(f32::INFINITY, 1.0, 2.0), f32::INFINITY);
        assert_eq!(compose(3.0, 2.0, 1.0), 7.0);
    }

    #[test]
    fn delta_replays_updates_in_order() {
        let updates = [(2.0, 1.0), (0.5, -3.0), (1.0, 0.25)];

        let mut live = 4.0;
        let mut delta = PendingDelta::identity(1);
        for (m, a) in updates.iter().copied() {
            live = compose(live, m, a);
            delta.record(0, m, a);
        }

        let mut base = [4.0];
        delta.apply_to(&mut base);
        assert_eq!(base[0], live);
    }

    #[test]
    fn overwrite_ignores_base() {
        let delta = PendingDelta::overwrite(&[1.0, 2.0]);
        let mut base = [f32::INFINITY, 9.0];
        delta.apply_to(&mut base);
        assert_eq!(base, [1.0, 2.0]);
    }

    #[test]
    fn first_update_fills_with_default() {
        let mut tile = CachedTile::default();
        assert!(!tile.is_dirty());

        tile.update(3, 0.5, 1, 2.0, 0.0);
        assert_eq!(tile.data, Some(vec![0.5, 1.0, 0.5]));
        assert!(tile.is_dirty());

        tile.rebase(vec![0.0, 0.25, 0.0], 4);
        assert_eq!(tile.data, Some(vec![0.0, 0.5, 0.0]));
        assert_eq!(tile.revision, 4);
    }
}
