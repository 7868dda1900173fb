//! Butcher tableaus for explicit Runge-Kutta methods.
//!
//! A tableau is validated once at construction and is immutable afterwards, so
//! the stepper in [`crate::solvers`] can index it without any checks.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance on |Σ b − 1|.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableauError {
    #[error("tableau `{name}` has no stages")]
    Empty { name: String },
    #[error("tableau `{name}` has {got} weights, expected {expected}")]
    WeightCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("tableau `{name}` has {got} coupling rows, expected {expected}")]
    RowCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("tableau `{name}` coupling row {row} has {got} entries, expected between {row} and {stages}")]
    RowLength {
        name: String,
        row: usize,
        stages: usize,
        got: usize,
    },
    #[error("tableau `{name}` is not explicit: a[{row}][{column}] = {value}")]
    NotExplicit {
        name: String,
        row: usize,
        column: usize,
        value: f64,
    },
    #[error("tableau `{name}` weights sum to {sum}, expected 1")]
    WeightSum { name: String, sum: f64 },
    #[error("tableau `{name}` contains a non-finite coefficient")]
    NonFinite { name: String },
}

/// An explicit Runge-Kutta method (c, a, b).
#[derive(Debug, Clone, PartialEq)]
pub struct ButcherTableau {
    name: String,
    order: u32,
    c: Vec<f64>,
    a: DMatrix<f64>,
    b: Vec<f64>,
}

impl ButcherTableau {
    /// Builds a tableau from ragged coupling rows.
    ///
    /// Row `i` may list only the `i` entries left of the diagonal or be padded
    /// with trailing zeros up to `s` entries; anything on or above the
    /// diagonal must be zero.
    pub fn new(
        name: impl Into<String>,
        order: u32,
        c: Vec<f64>,
        a_rows: Vec<Vec<f64>>,
        b: Vec<f64>,
    ) -> Result<Self, TableauError> {
        let name = name.into();
        let stages = c.len();
        if stages == 0 {
            return Err(TableauError::Empty { name });
        }
        if b.len() != stages {
            return Err(TableauError::WeightCount {
                name,
                expected: stages,
                got: b.len(),
            });
        }
        if a_rows.len() != stages {
            return Err(TableauError::RowCount {
                name,
                expected: stages,
                got: a_rows.len(),
            });
        }

        let mut a = DMatrix::zeros(stages, stages);
        for (row, entries) in a_rows.iter().enumerate() {
            if entries.len() < row || entries.len() > stages {
                return Err(TableauError::RowLength {
                    name,
                    row,
                    stages,
                    got: entries.len(),
                });
            }
            for (column, &value) in entries.iter().enumerate() {
                if !value.is_finite() {
                    return Err(TableauError::NonFinite { name });
                }
                if column >= row {
                    if value != 0.0 {
                        return Err(TableauError::NotExplicit {
                            name,
                            row,
                            column,
                            value,
                        });
                    }
                    continue;
                }
                a[(row, column)] = value;
            }
        }

        if c.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err(TableauError::NonFinite { name });
        }
        let sum: f64 = b.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(TableauError::WeightSum { name, sum });
        }

        Ok(Self { name, order, c, a, b })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nominal order of accuracy.
    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn stages(&self) -> usize {
        self.c.len()
    }

    /// Stage time offsets.
    pub fn c(&self) -> &[f64] {
        &self.c
    }

    /// Strictly lower-triangular coupling matrix.
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    /// Combination weights.
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Forward Euler.
    pub fn euler() -> Self {
        Self::builtin("Euler", 1, vec![0.0], vec![vec![]], vec![1.0])
    }

    /// The classic four-stage Runge-Kutta method.
    pub fn rk4() -> Self {
        Self::builtin(
            "RK4",
            4,
            vec![0.0, 0.5, 0.5, 1.0],
            vec![
                vec![0.0],
                vec![0.5, 0.0],
                vec![0.0, 0.5, 0.0],
                vec![0.0, 0.0, 1.0, 0.0],
            ],
            vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
        )
    }

    /// Prince & Dormand RK8(7)13M advanced with its embedded 7th-order
    /// weights. This is the high-order scheme of the reference comparison runs.
    pub fn dormand_prince_87() -> Self {
        let (c, a) = prince_dormand_13m_stages();
        let b = vec![
            13451932.0 / 455176623.0,
            0.0,
            0.0,
            0.0,
            0.0,
            -808719846.0 / 976000145.0,
            1757004468.0 / 5645159321.0,
            656045339.0 / 265891186.0,
            -3867574721.0 / 1518517206.0,
            465885868.0 / 322736535.0,
            53011238.0 / 667516719.0,
            2.0 / 45.0,
            0.0,
        ];
        Self::builtin("DP8(7)13M/7", 7, c, a, b)
    }

    /// Prince & Dormand RK8(7)13M advanced with its 8th-order weights.
    pub fn dormand_prince_8() -> Self {
        let (c, a) = prince_dormand_13m_stages();
        let b = vec![
            14005451.0 / 335480064.0,
            0.0,
            0.0,
            0.0,
            0.0,
            -59238493.0 / 1068277825.0,
            181606767.0 / 758867731.0,
            561292985.0 / 797845732.0,
            -1041891430.0 / 1371343529.0,
            760417239.0 / 1151165299.0,
            118820643.0 / 751138087.0,
            -528747749.0 / 2220607170.0,
            1.0 / 4.0,
        ];
        Self::builtin("DP8(7)13M/8", 8, c, a, b)
    }

    // Built-in coefficient sets are covered by the tests below; a failure here
    // is a typo in this file, not a runtime condition.
    fn builtin(name: &str, order: u32, c: Vec<f64>, a: Vec<Vec<f64>>, b: Vec<f64>) -> Self {
        match Self::new(name, order, c, a, b) {
            Ok(tableau) => tableau,
            Err(err) => panic!("built-in {err}"),
        }
    }
}

/// Nodes and coupling rows of RK8(7)13M.
///
/// Prince, P. J. & Dormand, J. R. (1981). "High order embedded Runge-Kutta
/// formulae". J. Comp. Appl. Math. 7(1), 67-75.
fn prince_dormand_13m_stages() -> (Vec<f64>, Vec<Vec<f64>>) {
    let c = vec![
        0.0,
        1.0 / 18.0,
        1.0 / 12.0,
        1.0 / 8.0,
        5.0 / 16.0,
        3.0 / 8.0,
        59.0 / 400.0,
        93.0 / 200.0,
        5490023248.0 / 9719169821.0,
        13.0 / 20.0,
        1201146811.0 / 1299019798.0,
        1.0,
        1.0,
    ];
    let a = vec![
        vec![],
        vec![1.0 / 18.0],
        vec![1.0 / 48.0, 1.0 / 16.0],
        vec![1.0 / 32.0, 0.0, 3.0 / 32.0],
        vec![5.0 / 16.0, 0.0, -75.0 / 64.0, 75.0 / 64.0],
        vec![3.0 / 80.0, 0.0, 0.0, 3.0 / 16.0, 3.0 / 20.0],
        vec![
            29443841.0 / 614563906.0,
            0.0,
            0.0,
            77736538.0 / 692538347.0,
            -28693883.0 / 1125000000.0,
            23124283.0 / 1800000000.0,
        ],
        vec![
            16016141.0 / 946692911.0,
            0.0,
            0.0,
            61564180.0 / 158732637.0,
            22789713.0 / 633445777.0,
            545815736.0 / 2771057229.0,
            -180193667.0 / 1043307555.0,
        ],
        vec![
            39632708.0 / 573591083.0,
            0.0,
            0.0,
            -433636366.0 / 683701615.0,
            -421739975.0 / 2616292301.0,
            100302831.0 / 723423059.0,
            790204164.0 / 839813087.0,
            800635310.0 / 3783071287.0,
        ],
        vec![
            246121993.0 / 1340847787.0,
            0.0,
            0.0,
            -37695042795.0 / 15268766246.0,
            -309121744.0 / 1061227803.0,
            -12992083.0 / 490766935.0,
            6005943493.0 / 2108947869.0,
            393006217.0 / 1396673457.0,
            123872331.0 / 1001029789.0,
        ],
        vec![
            -1028468189.0 / 846180014.0,
            0.0,
            0.0,
            8478235783.0 / 508512852.0,
            1311729495.0 / 1432422823.0,
            -10304129995.0 / 1701304382.0,
            -48777925059.0 / 3047939560.0,
            15336726248.0 / 1032824649.0,
            -45442868181.0 / 3398467696.0,
            3065993473.0 / 597172653.0,
        ],
        vec![
            185892177.0 / 718116043.0,
            0.0,
            0.0,
            -3185094517.0 / 667107341.0,
            -477755414.0 / 1098053517.0,
            -703635378.0 / 230739211.0,
            5731566787.0 / 1027545527.0,
            5232866602.0 / 850066563.0,
            -4093664535.0 / 808688257.0,
            3962137247.0 / 1805957418.0,
            65686358.0 / 487910083.0,
        ],
        vec![
            403863854.0 / 491063109.0,
            0.0,
            0.0,
            -5068492393.0 / 434740067.0,
            -411421997.0 / 543043805.0,
            652783627.0 / 914296604.0,
            11173962825.0 / 925320556.0,
            -13158990841.0 / 6184727034.0,
            3936647629.0 / 1978049680.0,
            -160528059.0 / 685178525.0,
            248638103.0 / 1413531060.0,
            0.0,
        ],
    ];
    (c, a)
}

/// A serializable choice of tableau, as it appears in run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SchemeSpec {
    Euler,
    Rk4,
    Dp87,
    Dp8,
    Custom {
        name: String,
        order: u32,
        c: Vec<f64>,
        a: Vec<Vec<f64>>,
        b: Vec<f64>,
    },
}

impl SchemeSpec {
    pub fn build(&self) -> Result<ButcherTableau, TableauError> {
        match self {
            SchemeSpec::Euler => Ok(ButcherTableau::euler()),
            SchemeSpec::Rk4 => Ok(ButcherTableau::rk4()),
            SchemeSpec::Dp87 => Ok(ButcherTableau::dormand_prince_87()),
            SchemeSpec::Dp8 => Ok(ButcherTableau::dormand_prince_8()),
            SchemeSpec::Custom { name, order, c, a, b } => {
                ButcherTableau::new(name.clone(), *order, c.clone(), a.clone(), b.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ButcherTableau, SchemeSpec, TableauError};

    fn assert_row_consistency(tableau: &ButcherTableau, tolerance: f64) {
        // c_i = Σ_j a_ij holds for all the built-in methods.
        for i in 0..tableau.stages() {
            let row_sum: f64 = tableau.a().row(i).iter().sum();
            assert!(
                (row_sum - tableau.c()[i]).abs() < tolerance,
                "{} row {i}: Σa = {row_sum}, c = {}",
                tableau.name(),
                tableau.c()[i]
            );
        }
    }

    #[test]
    fn builtin_tableaus_are_well_formed() {
        let euler = ButcherTableau::euler();
        assert_eq!(euler.stages(), 1);
        assert_eq!(euler.order(), 1);

        let rk4 = ButcherTableau::rk4();
        assert_eq!(rk4.stages(), 4);
        assert_eq!(rk4.order(), 4);
        assert_row_consistency(&rk4, 1e-15);

        let dp = ButcherTableau::dormand_prince_87();
        assert_eq!(dp.stages(), 13);
        assert_eq!(dp.order(), 7);
        assert_row_consistency(&dp, 1e-14);

        let dp8 = ButcherTableau::dormand_prince_8();
        assert_eq!(dp8.stages(), 13);
        assert_eq!(dp8.order(), 8);
        assert_eq!(dp8.a(), dp.a());
        assert_eq!(dp8.c(), dp.c());
        assert_ne!(dp8.b(), dp.b());
    }

    #[test]
    fn coupling_matrix_is_strictly_lower_triangular() {
        let dp = ButcherTableau::dormand_prince_87();
        let a = dp.a();
        assert_eq!(a.nrows(), 13);
        assert_eq!(a.ncols(), 13);
        for i in 0..13 {
            for j in i..13 {
                assert_eq!(a[(i, j)], 0.0);
            }
        }
        assert_eq!(a[(1, 0)], 1.0 / 18.0);
        assert_eq!(a[(4, 2)], -75.0 / 64.0);
    }

    #[test]
    fn rejects_mismatched_counts() {
        let err =
            ButcherTableau::new("t", 1, vec![0.0, 1.0], vec![vec![]], vec![1.0]).unwrap_err();
        assert!(matches!(err, TableauError::WeightCount { expected: 2, got: 1, .. }));

        let err =
            ButcherTableau::new("t", 1, vec![0.0], vec![], vec![1.0]).unwrap_err();
        assert!(matches!(err, TableauError::RowCount { expected: 1, got: 0, .. }));

        let err =
            ButcherTableau::new("t", 1, vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, TableauError::Empty { .. }));
    }

    #[test]
    fn rejects_short_and_long_rows() {
        let err = ButcherTableau::new(
            "t",
            2,
            vec![0.0, 1.0],
            vec![vec![], vec![]],
            vec![0.5, 0.5],
        )
        .unwrap_err();
        assert!(matches!(err, TableauError::RowLength { row: 1, got: 0, .. }));

        let err = ButcherTableau::new(
            "t",
            2,
            vec![0.0, 1.0],
            vec![vec![], vec![1.0, 0.0, 0.0]],
            vec![0.5, 0.5],
        )
        .unwrap_err();
        assert!(matches!(err, TableauError::RowLength { row: 1, got: 3, .. }));
    }

    #[test]
    fn rejects_implicit_coupling() {
        let err = ButcherTableau::new(
            "t",
            2,
            vec![0.0, 1.0],
            vec![vec![0.0, 0.5], vec![1.0, 0.0]],
            vec![0.5, 0.5],
        )
        .unwrap_err();
        assert!(matches!(err, TableauError::NotExplicit { row: 0, column: 1, .. }));
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let err =
            ButcherTableau::new("t", 1, vec![0.0], vec![vec![]], vec![0.9]).unwrap_err();
        assert!(matches!(err, TableauError::WeightSum { .. }));
        assert!(err.to_string().contains("weights sum to"));
    }

    #[test]
    fn rejects_non_finite_coefficients() {
        let err = ButcherTableau::new(
            "t",
            2,
            vec![0.0, f64::NAN],
            vec![vec![], vec![1.0]],
            vec![0.5, 0.5],
        )
        .unwrap_err();
        assert!(matches!(err, TableauError::NonFinite { .. }));
    }

    #[test]
    fn scheme_spec_builds_custom_tableau() {
        let heun = SchemeSpec::Custom {
            name: "Heun".to_string(),
            order: 2,
            c: vec![0.0, 1.0],
            a: vec![vec![], vec![1.0]],
            b: vec![0.5, 0.5],
        };
        let tableau = heun.build().unwrap();
        assert_eq!(tableau.name(), "Heun");
        assert_eq!(tableau.stages(), 2);
        assert_eq!(tableau.a()[(1, 0)], 1.0);

        assert_eq!(SchemeSpec::Rk4.build().unwrap(), ButcherTableau::rk4());
    }
}
