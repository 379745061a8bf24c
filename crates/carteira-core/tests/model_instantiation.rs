use std::path::PathBuf;

use carteira_core::data::{load_market_data, DataPaths, MarketData};
use carteira_core::model::{Cmp, ModelInstance, ModelParams};
use carteira_core::CarteiraError;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn fixture_data() -> MarketData {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    load_market_data(&DataPaths {
        returns: base.join("returns.csv"),
        covariance: base.join("covariance.csv"),
        sectors: base.join("sectors.csv"),
    })
    .unwrap()
}

fn params(m: u32) -> ModelParams {
    ModelParams {
        cardinality: m,
        max_weight: dec!(0.20),
        target_return: dec!(0.15),
    }
}

#[test]
fn universe_comes_from_covariance_columns() {
    let instance = ModelInstance::build(&fixture_data(), &params(4)).unwrap();
    assert_eq!(
        instance.assets,
        vec!["PETR4", "VALE3", "ITUB4", "ABEV3", "WEGE3", "ELET3", "RADL3", "CYRE3"]
    );
    assert_eq!(instance.mu[1], 0.22);
}

#[test]
fn sector_universe_is_filtered_and_sorted() {
    let instance = ModelInstance::build(&fixture_data(), &params(4)).unwrap();
    // BBDC4 is mapped but absent from the covariance universe, so its
    // row contributes nothing new; sectors come out sorted and unique.
    assert_eq!(
        instance.sectors,
        vec![
            "Construcao_Civil",
            "Consumer Staples",
            "Energy",
            "Financials",
            "Health Care",
            "Industrials",
            "Materials",
            "Utilities",
        ]
    );
    // Membership is by asset index into the universe.
    let financials = instance.sectors.iter().position(|s| s == "Financials").unwrap();
    assert_eq!(instance.members[financials], vec![2]); // ITUB4
}

#[test]
fn groups_partition_present_sectors_only() {
    let instance = ModelInstance::build(&fixture_data(), &params(4)).unwrap();
    let idx = |name: &str| instance.sectors.iter().position(|s| s == name).unwrap();

    assert_eq!(instance.groups.financial, vec![idx("Financials")]);
    assert_eq!(
        instance.groups.defensive,
        vec![idx("Consumer Staples"), idx("Health Care"), idx("Utilities")]
    );
    assert_eq!(
        instance.groups.commodity,
        vec![idx("Energy"), idx("Materials")]
    );
    assert_eq!(instance.groups.construction, vec![idx("Construcao_Civil")]);
    // No Information Technology in the fixture universe.
    assert!(instance.groups.technology.is_empty());
    assert_eq!(instance.groups.electric_utility, vec![idx("Utilities")]);
    // Siderurgia is absent as well.
    assert!(instance.groups.steel.is_empty());
}

#[test]
fn constraint_inventory_is_complete() {
    let instance = ModelInstance::build(&fixture_data(), &params(4)).unwrap();
    let constraints = instance.linear_constraints();
    let names: Vec<&str> = constraints.iter().map(|c| c.name.as_str()).collect();

    // 3 scalar + n weight caps + 2 per sector + 6 group rules.
    assert_eq!(constraints.len(), 3 + 8 + 2 * 8 + 6);
    assert!(names.contains(&"budget"));
    assert!(names.contains(&"target_return"));
    assert!(names.contains(&"cardinality"));
    assert!(names.contains(&"max_weight[PETR4]"));
    assert!(names.contains(&"sector_floor[Utilities]"));
    assert!(names.contains(&"sector_ceiling[Utilities]"));
    assert!(names.contains(&"tech_requires_utility"));
    assert!(names.contains(&"min_defensive"));
    assert!(names.contains(&"min_cyclical"));
    assert!(names.contains(&"max_commodity"));
    assert!(names.contains(&"min_distinct_sectors"));
    assert!(names.contains(&"max_rate_sensitive"));

    let cardinality = constraints.iter().find(|c| c.name == "cardinality").unwrap();
    assert_eq!(cardinality.cmp, Cmp::Eq);
    assert_eq!(cardinality.rhs, 4.0);
    assert_eq!(cardinality.terms.len(), 8);
}

#[test]
fn conditional_constraint_is_vacuous_without_tech_and_utilities() {
    let mut data = fixture_data();
    // Strip the utilities asset's sector assignment so neither slot of
    // the conditional resolves.
    data.sectors.entries.retain(|e| e.sector != "Utilities");
    let instance = ModelInstance::build(&data, &params(4)).unwrap();

    assert!(instance.groups.technology.is_empty());
    assert!(instance.groups.electric_utility.is_empty());

    let constraints = instance.linear_constraints();
    let conditional = constraints
        .iter()
        .find(|c| c.name == "tech_requires_utility")
        .unwrap();
    // Present but vacuous: 0 <= 0.
    assert!(conditional.terms.is_empty());
    assert_eq!(conditional.cmp, Cmp::Le);
    assert_eq!(conditional.rhs, 0.0);
}

#[test]
fn cardinality_beyond_universe_is_rejected() {
    let err = ModelInstance::build(&fixture_data(), &params(9)).unwrap_err();
    assert!(matches!(err, CarteiraError::InvalidInput { .. }));
}

#[test]
fn missing_expected_return_is_rejected() {
    let mut data = fixture_data();
    data.returns = carteira_core::data::ExpectedReturns::new(vec![("PETR4".into(), dec!(0.18))]);
    let err = ModelInstance::build(&data, &params(2)).unwrap_err();
    match err {
        CarteiraError::InvalidInput { field, reason } => {
            assert_eq!(field, "expected_returns");
            assert!(reason.contains("VALE3"));
        }
        other => panic!("expected InvalidInput, got {:?}", other),
    }
}

#[test]
fn variable_indexing_is_weights_then_flags_then_sectors() {
    use carteira_core::model::Var;
    let instance = ModelInstance::build(&fixture_data(), &params(4)).unwrap();
    let n = instance.num_assets();
    assert_eq!(instance.num_vars(), 2 * n + instance.num_sectors());
    assert_eq!(instance.var_index(Var::Weight(3)), 3);
    assert_eq!(instance.var_index(Var::Selected(0)), n);
    assert_eq!(instance.var_index(Var::SectorOn(2)), 2 * n + 2);
}
