use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::MarketData;
use crate::error::CarteiraError;
use crate::types::Rate;
use crate::CarteiraResult;

// ---------------------------------------------------------------------------
// Sector classification tables
// ---------------------------------------------------------------------------

/// Literal sector lists for each named group. A sector participates in a
/// group only by exact string match against these tables.
pub const FINANCIAL_SECTORS: &[&str] = &["Financials"];
pub const DEFENSIVE_SECTORS: &[&str] = &["Consumer Staples", "Health Care", "Utilities"];
pub const CYCLICAL_SECTORS: &[&str] = &[
    "Consumer Discretionary",
    "Financials",
    "Industrials",
    "Real Estate",
    "Information Technology",
    "Communication Services",
];
pub const COMMODITY_SECTORS: &[&str] = &["Energy", "Materials"];
pub const RATE_SENSITIVE_SECTORS: &[&str] = &["Financials", "Utilities", "Real Estate"];

/// Named single-sector slots.
pub const STEEL_SECTOR: &str = "Siderurgia";
pub const CONSTRUCTION_SECTOR: &str = "Construcao_Civil";
pub const TECHNOLOGY_SECTOR: &str = "Information Technology";
pub const ELECTRIC_UTILITY_SECTOR: &str = "Utilities";

/// Minimum number of distinct sectors in any feasible portfolio.
pub const MIN_DISTINCT_SECTORS: f64 = 4.0;
/// Maximum number of rate-sensitive sectors allowed.
pub const MAX_RATE_SENSITIVE_SECTORS: f64 = 2.0;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Scalar parameters for one model instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Exact number of assets to select.
    pub cardinality: u32,
    /// Maximum weight of any single selected asset.
    pub max_weight: Rate,
    /// Minimum acceptable expected portfolio return.
    pub target_return: Rate,
}

// ---------------------------------------------------------------------------
// Sector groups
// ---------------------------------------------------------------------------

/// Indices (into the instantiated sector universe) of each named group.
/// Groups whose sectors are absent from the data resolve to empty sets,
/// never to errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorGroups {
    pub financial: Vec<usize>,
    pub defensive: Vec<usize>,
    pub cyclical: Vec<usize>,
    pub commodity: Vec<usize>,
    pub rate_sensitive: Vec<usize>,
    pub steel: Vec<usize>,
    pub construction: Vec<usize>,
    pub technology: Vec<usize>,
    pub electric_utility: Vec<usize>,
}

impl SectorGroups {
    /// Partition a sector universe into the fixed named groups.
    pub fn resolve(sectors: &[String]) -> Self {
        let indices_of = |listed: &[&str]| -> Vec<usize> {
            sectors
                .iter()
                .enumerate()
                .filter(|(_, s)| listed.contains(&s.as_str()))
                .map(|(i, _)| i)
                .collect()
        };
        SectorGroups {
            financial: indices_of(FINANCIAL_SECTORS),
            defensive: indices_of(DEFENSIVE_SECTORS),
            cyclical: indices_of(CYCLICAL_SECTORS),
            commodity: indices_of(COMMODITY_SECTORS),
            rate_sensitive: indices_of(RATE_SENSITIVE_SECTORS),
            steel: indices_of(&[STEEL_SECTOR]),
            construction: indices_of(&[CONSTRUCTION_SECTOR]),
            technology: indices_of(&[TECHNOLOGY_SECTOR]),
            electric_utility: indices_of(&[ELECTRIC_UTILITY_SECTOR]),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision variables and constraints (declarative form)
// ---------------------------------------------------------------------------

/// One decision variable of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    /// Continuous weight of asset i, >= 0.
    Weight(usize),
    /// Binary selection flag of asset i.
    Selected(usize),
    /// Binary flag of sector s.
    SectorOn(usize),
}

/// Constraint relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Le,
    Ge,
}

/// A single linear constraint: sum of (var * coefficient) cmp rhs.
/// An empty term list is a vacuous constraint (0 cmp rhs) and is kept in
/// the model rather than omitted.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(Var, f64)>,
    pub cmp: Cmp,
    pub rhs: f64,
}

// ---------------------------------------------------------------------------
// Model instance
// ---------------------------------------------------------------------------

/// A fully populated model: the asset/sector universes, sector membership,
/// group partition, and all numeric parameters marshaled to solver-native
/// f64. The objective is minimize w' Sigma w over the weight variables;
/// `linear_constraints` yields everything else.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    pub assets: Vec<String>,
    pub sectors: Vec<String>,
    /// Asset indices per sector, aligned with `sectors`.
    pub members: Vec<Vec<usize>>,
    pub groups: SectorGroups,
    pub mu: Vec<f64>,
    /// Row-major covariance, square over `assets`.
    pub sigma: Vec<Vec<f64>>,
    pub cardinality: u32,
    pub max_weight: f64,
    pub target_return: f64,
}

impl ModelInstance {
    /// Populate a fresh instance from loaded data and a parameter record.
    ///
    /// The asset universe is the covariance matrix's column labels; the
    /// sector universe is the mapping filtered to assets present, sorted.
    pub fn build(data: &MarketData, params: &ModelParams) -> CarteiraResult<Self> {
        let assets: Vec<String> = data.covariance.tickers.clone();
        let n = assets.len();

        if params.cardinality == 0 {
            return Err(CarteiraError::InvalidInput {
                field: "cardinality".into(),
                reason: "must be at least 1".into(),
            });
        }
        if params.cardinality as usize > n {
            return Err(CarteiraError::InvalidInput {
                field: "cardinality".into(),
                reason: format!("{} exceeds the {}-asset universe", params.cardinality, n),
            });
        }
        if params.max_weight <= Decimal::ZERO || params.max_weight > Decimal::ONE {
            return Err(CarteiraError::InvalidInput {
                field: "max_weight".into(),
                reason: "must be in (0, 1]".into(),
            });
        }

        let mut mu = Vec::with_capacity(n);
        for ticker in &assets {
            let r = data.returns.get(ticker).ok_or_else(|| CarteiraError::InvalidInput {
                field: "expected_returns".into(),
                reason: format!("no expected return for '{}'", ticker),
            })?;
            mu.push(to_f64(r, "expected return")?);
        }

        let mut sigma = Vec::with_capacity(n);
        for row in &data.covariance.rows {
            let mut out = Vec::with_capacity(n);
            for v in row {
                out.push(to_f64(*v, "covariance")?);
            }
            sigma.push(out);
        }

        // Sector universe: mapping rows whose ticker is in the universe,
        // deduplicated and sorted.
        let mut sectors: Vec<String> = data
            .sectors
            .entries
            .iter()
            .filter(|e| assets.iter().any(|a| a == &e.ticker))
            .map(|e| e.sector.clone())
            .collect();
        sectors.sort();
        sectors.dedup();

        let members: Vec<Vec<usize>> = sectors
            .iter()
            .map(|sector| {
                assets
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| data.sectors.sector_of(a) == Some(sector.as_str()))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        let groups = SectorGroups::resolve(&sectors);

        Ok(ModelInstance {
            assets,
            sectors,
            members,
            groups,
            mu,
            sigma,
            cardinality: params.cardinality,
            max_weight: to_f64(params.max_weight, "max_weight")?,
            target_return: to_f64(params.target_return, "target_return")?,
        })
    }

    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    pub fn num_sectors(&self) -> usize {
        self.sectors.len()
    }

    /// Total decision variable count: n weights, n selection flags, s
    /// sector flags.
    pub fn num_vars(&self) -> usize {
        2 * self.num_assets() + self.num_sectors()
    }

    /// Flat variable index used by solver backends: weights first, then
    /// asset flags, then sector flags.
    pub fn var_index(&self, var: Var) -> usize {
        let n = self.num_assets();
        match var {
            Var::Weight(i) => i,
            Var::Selected(i) => n + i,
            Var::SectorOn(s) => 2 * n + s,
        }
    }

    /// The quadratic objective: minimize w' Sigma w.
    pub fn objective_matrix(&self) -> &[Vec<f64>] {
        &self.sigma
    }

    /// All linear constraints of the model, in a fixed order.
    pub fn linear_constraints(&self) -> Vec<LinearConstraint> {
        let n = self.num_assets();
        let mut out = Vec::new();

        // All capital is allocated.
        out.push(LinearConstraint {
            name: "budget".into(),
            terms: (0..n).map(|i| (Var::Weight(i), 1.0)).collect(),
            cmp: Cmp::Eq,
            rhs: 1.0,
        });

        // Expected portfolio return meets the target.
        out.push(LinearConstraint {
            name: "target_return".into(),
            terms: (0..n).map(|i| (Var::Weight(i), self.mu[i])).collect(),
            cmp: Cmp::Ge,
            rhs: self.target_return,
        });

        // Exactly `m` assets selected.
        out.push(LinearConstraint {
            name: "cardinality".into(),
            terms: (0..n).map(|i| (Var::Selected(i), 1.0)).collect(),
            cmp: Cmp::Eq,
            rhs: f64::from(self.cardinality),
        });

        // Weight is capped, and forced to zero when the asset is not
        // selected: w_i - W_max * b_i <= 0.
        for i in 0..n {
            out.push(LinearConstraint {
                name: format!("max_weight[{}]", self.assets[i]),
                terms: vec![(Var::Weight(i), 1.0), (Var::Selected(i), -self.max_weight)],
                cmp: Cmp::Le,
                rhs: 0.0,
            });
        }

        // A sector flag may only be on if at least one of its assets is
        // selected, and must be on if any of them is.
        for (s, members) in self.members.iter().enumerate() {
            let mut lower = vec![(Var::SectorOn(s), 1.0)];
            lower.extend(members.iter().map(|&i| (Var::Selected(i), -1.0)));
            out.push(LinearConstraint {
                name: format!("sector_floor[{}]", self.sectors[s]),
                terms: lower,
                cmp: Cmp::Le,
                rhs: 0.0,
            });

            let mut upper: Vec<(Var, f64)> =
                members.iter().map(|&i| (Var::Selected(i), 1.0)).collect();
            upper.push((Var::SectorOn(s), -(members.len() as f64)));
            out.push(LinearConstraint {
                name: format!("sector_ceiling[{}]", self.sectors[s]),
                terms: upper,
                cmp: Cmp::Le,
                rhs: 0.0,
            });
        }

        // Technology may only enter alongside electric utilities. With
        // both slots empty this is 0 <= 0 and binds nothing.
        let mut conditional: Vec<(Var, f64)> = self
            .groups
            .technology
            .iter()
            .map(|&s| (Var::SectorOn(s), 1.0))
            .collect();
        conditional.extend(
            self.groups
                .electric_utility
                .iter()
                .map(|&s| (Var::SectorOn(s), -1.0)),
        );
        out.push(LinearConstraint {
            name: "tech_requires_utility".into(),
            terms: conditional,
            cmp: Cmp::Le,
            rhs: 0.0,
        });

        out.push(self.group_count("min_defensive", &self.groups.defensive, Cmp::Ge, 1.0));
        out.push(self.group_count("min_cyclical", &self.groups.cyclical, Cmp::Ge, 1.0));
        out.push(self.group_count("max_commodity", &self.groups.commodity, Cmp::Le, 1.0));

        // Broad diversification across all sectors.
        out.push(LinearConstraint {
            name: "min_distinct_sectors".into(),
            terms: (0..self.num_sectors())
                .map(|s| (Var::SectorOn(s), 1.0))
                .collect(),
            cmp: Cmp::Ge,
            rhs: MIN_DISTINCT_SECTORS,
        });

        out.push(self.group_count(
            "max_rate_sensitive",
            &self.groups.rate_sensitive,
            Cmp::Le,
            MAX_RATE_SENSITIVE_SECTORS,
        ));

        out
    }

    fn group_count(&self, name: &str, group: &[usize], cmp: Cmp, rhs: f64) -> LinearConstraint {
        LinearConstraint {
            name: name.into(),
            terms: group.iter().map(|&s| (Var::SectorOn(s), 1.0)).collect(),
            cmp,
            rhs,
        }
    }
}

fn to_f64(value: Decimal, what: &str) -> CarteiraResult<f64> {
    value.to_f64().ok_or_else(|| CarteiraError::InvalidInput {
        field: what.into(),
        reason: format!("'{}' is not representable as f64", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn universe(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_match_by_literal_name_only() {
        let sectors = universe(&["Financials", "Health Care", "Banking", "Energy"]);
        let groups = SectorGroups::resolve(&sectors);
        assert_eq!(groups.financial, vec![0]);
        assert_eq!(groups.defensive, vec![1]);
        assert_eq!(groups.commodity, vec![3]);
        // "Banking" is in no table.
        assert!(!groups.cyclical.contains(&2));
        assert!(!groups.rate_sensitive.contains(&2));
    }

    #[test]
    fn absent_sectors_yield_empty_groups() {
        let sectors = universe(&["Siderurgia", "Materials"]);
        let groups = SectorGroups::resolve(&sectors);
        assert_eq!(groups.steel, vec![0]);
        assert!(groups.technology.is_empty());
        assert!(groups.electric_utility.is_empty());
        assert!(groups.defensive.is_empty());
        assert!(groups.financial.is_empty());
    }

    #[test]
    fn sector_in_several_groups() {
        let sectors = universe(&["Financials", "Utilities"]);
        let groups = SectorGroups::resolve(&sectors);
        assert_eq!(groups.financial, vec![0]);
        assert_eq!(groups.cyclical, vec![0]);
        assert_eq!(groups.rate_sensitive, vec![0, 1]);
        assert_eq!(groups.defensive, vec![1]);
        assert_eq!(groups.electric_utility, vec![1]);
    }
}
