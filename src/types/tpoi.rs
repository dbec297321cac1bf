/// Time points closer than this are considered equal. Unit: `ms`
pub const TIME_ERR_TOL: f64 = 1e-6;

/// Time point of interest of an atomic block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tpoi {
    /// Relative to the start of the block. Unit: `ms`
    pub time: f64,
    /// Receiver phase of an ADC sample, negative for structural markers
    /// (block boundaries, corners of the waveform). Unit: `rad`
    pub phase: f64,
}

impl Tpoi {
    pub fn marker(time: f64) -> Self {
        Self { time, phase: -1.0 }
    }

    pub fn adc(time: f64, phase: f64) -> Self {
        Self { time, phase }
    }

    pub fn is_adc(&self) -> bool {
        self.phase >= 0.0
    }
}

/// Time points of interest of one block, always sorted by time.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct TpoiSet {
    points: Vec<Tpoi>,
}

impl TpoiSet {
    pub fn reset(&mut self) {
        self.points.clear();
    }

    /// Inserts a point at its place in time. A point closer than
    /// `TIME_ERR_TOL` to an existing one is merged into it: an ADC sample
    /// takes over a marker, otherwise the existing point stays.
    /// Negative times are outside of the block and ignored.
    pub fn insert(&mut self, tpoi: Tpoi) {
        if tpoi.time < 0.0 {
            return;
        }

        let idx = self.points.partition_point(|p| p.time < tpoi.time);
        for neighbour in [idx.checked_sub(1), Some(idx)].into_iter().flatten() {
            if let Some(existing) = self.points.get_mut(neighbour) {
                if (existing.time - tpoi.time).abs() < TIME_ERR_TOL {
                    if tpoi.is_adc() && !existing.is_adc() {
                        existing.phase = tpoi.phase;
                    }
                    return;
                }
            }
        }
        self.points.insert(idx, tpoi);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Tpoi> {
        self.points.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tpoi> + '_ {
        self.points.iter()
    }

    /// Number of true ADC samples, markers excluded.
    pub fn num_adcs(&self) -> usize {
        self.points.iter().filter(|p| p.is_adc()).count()
    }
}
