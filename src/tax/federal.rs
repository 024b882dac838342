use super::tables::Bracket;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

/// Portion of income taxed at one marginal rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct BracketSlice {
    #[schemars(with = "f64")]
    pub lower: Decimal,
    #[schemars(with = "Option<f64>")]
    pub upper: Option<Decimal>,
    #[schemars(with = "f64")]
    pub rate: Decimal,
    #[schemars(with = "f64")]
    pub taxable: Decimal,
    #[schemars(with = "f64")]
    pub tax: Decimal,
}

/// Split income across ascending marginal brackets.
///
/// Each bracket taxes at most `upper - previous_upper` of the remaining income. Anything
/// left after the last explicit bound is taxed at the last bracket's rate.
pub fn bracket_slices(income: Decimal, brackets: &[Bracket]) -> Vec<BracketSlice> {
    let mut slices = Vec::new();
    let mut remaining = income.max(Decimal::ZERO);
    let mut lower = Decimal::ZERO;

    for bracket in brackets {
        if remaining <= Decimal::ZERO {
            break;
        }
        let width = match bracket.upper_bound {
            Some(upper) => (upper - lower).max(Decimal::ZERO),
            None => remaining,
        };
        let taxable = remaining.min(width);
        if taxable > Decimal::ZERO {
            slices.push(BracketSlice {
                lower,
                upper: bracket.upper_bound,
                rate: bracket.rate,
                taxable,
                tax: taxable * bracket.rate,
            });
        }
        remaining -= taxable;
        match bracket.upper_bound {
            Some(upper) => lower = upper,
            None => break,
        }
    }

    if remaining > Decimal::ZERO {
        if let Some(last) = brackets.last() {
            slices.push(BracketSlice {
                lower,
                upper: None,
                rate: last.rate,
                taxable: remaining,
                tax: remaining * last.rate,
            });
        }
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FilingStatus;
    use crate::tax::tables::TaxTables;
    use rust_decimal_macros::dec;

    fn single_2024() -> Vec<Bracket> {
        TaxTables::builtin()
            .for_year(2024)
            .brackets(FilingStatus::Single)
            .to_vec()
    }

    fn tax(income: Decimal, brackets: &[Bracket]) -> Decimal {
        bracket_slices(income, brackets).iter().map(|s| s.tax).sum()
    }

    #[test]
    fn zero_and_negative_income() {
        let brackets = single_2024();
        assert_eq!(tax(Decimal::ZERO, &brackets), Decimal::ZERO);
        assert_eq!(tax(dec!(-5000), &brackets), Decimal::ZERO);
        assert!(bracket_slices(Decimal::ZERO, &brackets).is_empty());
    }

    #[test]
    fn within_first_bracket() {
        assert_eq!(tax(dec!(10000), &single_2024()), dec!(1000));
    }

    #[test]
    fn exactly_on_a_bound() {
        let brackets = single_2024();
        assert_eq!(tax(dec!(11600), &brackets), dec!(1160));
        // 1160 + (47150 - 11600) * 12%
        assert_eq!(tax(dec!(47150), &brackets), dec!(5426));
    }

    #[test]
    fn marginal_not_average() {
        // 1160 + 29561.14 * 12%
        let total = tax(dec!(41161.14), &single_2024());
        assert_eq!(total.round_dp(2), dec!(4707.34));
    }

    #[test]
    fn top_bracket_uncapped() {
        let brackets = single_2024();
        let slices = bracket_slices(dec!(1000000), &brackets);
        assert_eq!(slices.len(), 7);
        let top = slices.last().unwrap();
        assert_eq!(top.lower, dec!(609350));
        assert_eq!(top.upper, None);
        assert_eq!(top.taxable, dec!(390650));
        assert_eq!(slices.iter().map(|s| s.taxable).sum::<Decimal>(), dec!(1000000));
    }

    #[test]
    fn income_beyond_last_explicit_bound_uses_last_rate() {
        let brackets = vec![
            Bracket::new(dec!(100), dec!(0.10)),
            Bracket::new(dec!(200), dec!(0.20)),
        ];
        let slices = bracket_slices(dec!(500), &brackets);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[2].taxable, dec!(300));
        assert_eq!(slices[2].rate, dec!(0.20));
        assert_eq!(tax(dec!(500), &brackets), dec!(90));
    }
}
