//! Multi-dimensional cost model for federated plans.
//!
//! A [`FederatedCost`] tracks five non-negative dimensions. Rows are a
//! cardinality estimate and never enter the scalar ordering; the other four
//! are combined by a fixed weighted sum.

mod estimator;
mod factory;

pub use estimator::CostEstimator;
pub use factory::CostFactory;

use common_config::CostConfig;

/// Epsilon for strict comparisons.
pub const STRICT_EPSILON: f64 = 1e-10;
/// Epsilon for "equal within epsilon" comparisons.
pub const EQUALITY_EPSILON: f64 = 1e-5;

/// Operations every plan cost supports.
pub trait PlanCost: Sized {
    fn rows(&self) -> f64;
    fn cpu(&self) -> f64;
    fn io(&self) -> f64;
    fn is_infinite(&self) -> bool;
    /// Weighted scalar used for ordering.
    fn total_cost(&self) -> f64;
    fn plus(&self, other: &Self) -> Self;
    fn minus(&self, other: &Self) -> Self;
    fn multiply_by(&self, factor: f64) -> Self;
    /// Ratio of this cost to `other`.
    fn divide_by(&self, other: &Self) -> f64;
    fn is_lt(&self, other: &Self) -> bool;
    fn is_le(&self, other: &Self) -> bool;
    fn is_eq_with_epsilon(&self, other: &Self) -> bool;
}

/// Weights of the scalar ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostWeights {
    pub cpu: f64,
    pub io: f64,
    pub network: f64,
    pub memory: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self::from(&CostConfig::default())
    }
}

impl From<&CostConfig> for CostWeights {
    fn from(config: &CostConfig) -> Self {
        Self {
            cpu: config.cpu_weight,
            io: config.io_weight,
            network: config.network_weight,
            memory: config.memory_weight,
        }
    }
}

/// Cost of a (sub)plan over rows, CPU, I/O, network and memory.
///
/// The infinite cost is a sentinel: it is never less than anything and
/// everything finite is less than it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FederatedCost {
    rows: f64,
    cpu: f64,
    io: f64,
    network: f64,
    memory: f64,
    infinite: bool,
    weights: CostWeights,
}

impl FederatedCost {
    /// Build a finite cost. Negative inputs clamp to zero.
    pub fn new(
        rows: f64,
        cpu: f64,
        io: f64,
        network: f64,
        memory: f64,
        weights: CostWeights,
    ) -> Self {
        Self {
            rows: rows.max(0.0),
            cpu: cpu.max(0.0),
            io: io.max(0.0),
            network: network.max(0.0),
            memory: memory.max(0.0),
            infinite: false,
            weights,
        }
    }

    pub fn zero(weights: CostWeights) -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, weights)
    }

    pub fn infinite(weights: CostWeights) -> Self {
        Self {
            rows: f64::INFINITY,
            cpu: f64::INFINITY,
            io: f64::INFINITY,
            network: f64::INFINITY,
            memory: f64::INFINITY,
            infinite: true,
            weights,
        }
    }

    pub fn network(&self) -> f64 {
        self.network
    }

    pub fn memory(&self) -> f64 {
        self.memory
    }

    pub fn weights(&self) -> CostWeights {
        self.weights
    }

    pub fn is_zero(&self) -> bool {
        !self.infinite
            && self.rows == 0.0
            && self.cpu == 0.0
            && self.io == 0.0
            && self.network == 0.0
            && self.memory == 0.0
    }

    fn map_dims(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(
            f(self.rows, other.rows),
            f(self.cpu, other.cpu),
            f(self.io, other.io),
            f(self.network, other.network),
            f(self.memory, other.memory),
            self.weights,
        )
    }
}

impl PlanCost for FederatedCost {
    fn rows(&self) -> f64 {
        self.rows
    }

    fn cpu(&self) -> f64 {
        self.cpu
    }

    fn io(&self) -> f64 {
        self.io
    }

    fn is_infinite(&self) -> bool {
        self.infinite
    }

    fn total_cost(&self) -> f64 {
        if self.infinite {
            return f64::INFINITY;
        }
        self.cpu * self.weights.cpu
            + self.io * self.weights.io
            + self.network * self.weights.network
            + self.memory * self.weights.memory
    }

    fn plus(&self, other: &Self) -> Self {
        if self.infinite || other.infinite {
            return Self::infinite(self.weights);
        }
        self.map_dims(other, |a, b| a + b)
    }

    fn minus(&self, other: &Self) -> Self {
        if self.infinite {
            return Self::infinite(self.weights);
        }
        if other.infinite {
            return Self::zero(self.weights);
        }
        self.map_dims(other, |a, b| a - b)
    }

    fn multiply_by(&self, factor: f64) -> Self {
        if self.infinite {
            return *self;
        }
        let factor = factor.max(0.0);
        Self::new(
            self.rows * factor,
            self.cpu * factor,
            self.io * factor,
            self.network * factor,
            self.memory * factor,
            self.weights,
        )
    }

    fn divide_by(&self, other: &Self) -> f64 {
        match (self.infinite, other.infinite) {
            (true, true) => 1.0,
            (true, false) => f64::INFINITY,
            (false, true) => 0.0,
            (false, false) => {
                let denominator = other.total_cost();
                if denominator == 0.0 {
                    1.0
                } else {
                    self.total_cost() / denominator
                }
            }
        }
    }

    fn is_lt(&self, other: &Self) -> bool {
        match (self.infinite, other.infinite) {
            (true, _) => false,
            (false, true) => true,
            (false, false) => self.total_cost() < other.total_cost() - STRICT_EPSILON,
        }
    }

    fn is_le(&self, other: &Self) -> bool {
        match (self.infinite, other.infinite) {
            (true, true) => true,
            (true, false) => false,
            (false, true) => true,
            (false, false) => self.total_cost() <= other.total_cost() + STRICT_EPSILON,
        }
    }

    fn is_eq_with_epsilon(&self, other: &Self) -> bool {
        match (self.infinite, other.infinite) {
            (true, true) => true,
            (false, false) => (self.total_cost() - other.total_cost()).abs() < EQUALITY_EPSILON,
            _ => false,
        }
    }
}

impl std::fmt::Display for FederatedCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.infinite {
            return write!(f, "{{inf}}");
        }
        write!(
            f,
            "{{{:.1} rows, {:.1} cpu, {:.1} io, {:.1} network, {:.1} memory, total {:.3}}}",
            self.rows,
            self.cpu,
            self.io,
            self.network,
            self.memory,
            self.total_cost()
        )
    }
}
