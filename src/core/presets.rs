use serde::Serialize;

use super::types::PortfolioDefinition;

// Historical assumptions behind the preset catalog.
const STOCK_RETURN: f64 = 0.10;
const BOND_RETURN: f64 = 0.05;
const STOCK_STD: f64 = 0.20;
const BOND_STD: f64 = 0.05;
const STOCK_BOND_CORRELATION: f64 = 0.1;

/// Risk categorization by stock allocation, used alongside the preset
/// listing in the portfolios endpoint.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Balanced,
    Aggressive,
}

impl RiskLevel {
    pub fn from_stock_allocation(stocks_percentage: f64) -> Self {
        if stocks_percentage <= 30.0 {
            RiskLevel::Conservative
        } else if stocks_percentage <= 60.0 {
            RiskLevel::Moderate
        } else if stocks_percentage <= 80.0 {
            RiskLevel::Balanced
        } else {
            RiskLevel::Aggressive
        }
    }
}

/// Expected annual return of a stock/bond mix under the historical
/// assumptions.
pub fn derived_expected_return(stocks_percentage: f64, bonds_percentage: f64) -> f64 {
    let stock_weight = stocks_percentage / 100.0;
    let bond_weight = bonds_percentage / 100.0;
    stock_weight * STOCK_RETURN + bond_weight * BOND_RETURN
}

/// Annual standard deviation of a stock/bond mix via the two-asset
/// portfolio-variance formula.
pub fn derived_volatility(stocks_percentage: f64, bonds_percentage: f64) -> f64 {
    let stock_weight = stocks_percentage / 100.0;
    let bond_weight = bonds_percentage / 100.0;
    let variance = stock_weight.powi(2) * STOCK_STD.powi(2)
        + bond_weight.powi(2) * BOND_STD.powi(2)
        + 2.0 * stock_weight * bond_weight * STOCK_BOND_CORRELATION * STOCK_STD * BOND_STD;
    variance.sqrt()
}

fn preset_definition(id: &str, name: &str, stocks_percentage: f64) -> PortfolioDefinition {
    let bonds_percentage = 100.0 - stocks_percentage;
    PortfolioDefinition {
        id: id.to_string(),
        name: name.to_string(),
        stocks_percentage,
        bonds_percentage,
        expected_return: derived_expected_return(stocks_percentage, bonds_percentage),
        volatility: derived_volatility(stocks_percentage, bonds_percentage),
    }
}

/// The three strategy variants the external simulator is asked to run.
pub fn presets() -> Vec<PortfolioDefinition> {
    vec![
        preset_definition("conservative", "Conservative (50/50)", 50.0),
        preset_definition("balanced", "Balanced (70/30)", 70.0),
        preset_definition("aggressive", "Aggressive (90/10)", 90.0),
    ]
}

pub fn preset(id: &str) -> Option<PortfolioDefinition> {
    presets().into_iter().find(|p| p.id == id)
}
