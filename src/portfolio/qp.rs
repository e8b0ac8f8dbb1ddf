//! Dense quadratic programs solved with Clarabel.
//!
//! minimize    ½ xᵀPx + qᵀx
//! subject to  a_eqᵀx  = b_eq
//!             a_inᵀx <= b_in

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TierfolioError};

/// Interior-point solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Print solver progress.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Absolute duality gap tolerance.
    pub tol_gap_abs: f64,
    /// Relative duality gap tolerance.
    pub tol_gap_rel: f64,
    /// Feasibility tolerance.
    pub tol_feas: f64,
    /// Largest correction to the solved weights accepted before the result is
    /// treated as a solver/bounds inconsistency.
    pub weight_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_iter: 200,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            tol_feas: 1e-8,
            weight_tolerance: 1e-4,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(TierfolioError::config("solver.max_iter must be positive"));
        }
        for (name, tol) in [
            ("tol_gap_abs", self.tol_gap_abs),
            ("tol_gap_rel", self.tol_gap_rel),
            ("tol_feas", self.tol_feas),
            ("weight_tolerance", self.weight_tolerance),
        ] {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(TierfolioError::config(format!("solver.{name} must be positive")));
            }
        }
        Ok(())
    }
}

/// Solved program.
#[derive(Debug, Clone)]
pub struct QpSolution {
    pub x: Vec<f64>,
    pub iterations: u32,
    pub status: String,
}

/// Dense QP description.
#[derive(Debug, Clone)]
pub struct QuadraticProgram {
    n: usize,
    /// Row-major `n x n`, symmetric.
    p: Vec<f64>,
    q: Vec<f64>,
    eq_rows: Vec<Vec<f64>>,
    eq_rhs: Vec<f64>,
    in_rows: Vec<Vec<f64>>,
    in_rhs: Vec<f64>,
}

impl QuadraticProgram {
    /// Program over `n` variables with zero objective and no constraints.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            p: vec![0.0; n * n],
            q: vec![0.0; n],
            eq_rows: Vec::new(),
            eq_rhs: Vec::new(),
            in_rows: Vec::new(),
            in_rhs: Vec::new(),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.n
    }

    /// Set `P[i][j]` and `P[j][i]`.
    pub fn set_quadratic(&mut self, i: usize, j: usize, value: f64) {
        self.p[i * self.n + j] = value;
        self.p[j * self.n + i] = value;
    }

    /// Add `rowᵀx = rhs`.
    pub fn add_equality(&mut self, row: Vec<f64>, rhs: f64) {
        debug_assert_eq!(row.len(), self.n);
        self.eq_rows.push(row);
        self.eq_rhs.push(rhs);
    }

    /// Add `rowᵀx <= rhs`.
    pub fn add_inequality(&mut self, row: Vec<f64>, rhs: f64) {
        debug_assert_eq!(row.len(), self.n);
        self.in_rows.push(row);
        self.in_rhs.push(rhs);
    }

    /// Solve with Clarabel. Only `Solved` and `AlmostSolved` count as success;
    /// any other status comes back as the error string.
    pub fn solve(&self, config: &SolverConfig) -> std::result::Result<QpSolution, String> {
        let p = self.upper_triangle();
        let rows: Vec<&Vec<f64>> = self.eq_rows.iter().chain(self.in_rows.iter()).collect();
        let a = csc_from_rows(&rows, self.n);
        let b: Vec<f64> = self.eq_rhs.iter().chain(self.in_rhs.iter()).copied().collect();

        let mut cones = Vec::new();
        if !self.eq_rows.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(self.eq_rows.len()));
        }
        if !self.in_rows.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(self.in_rows.len()));
        }

        let settings = DefaultSettingsBuilder::<f64>::default()
            .verbose(config.verbose)
            .max_iter(config.max_iter)
            .tol_gap_abs(config.tol_gap_abs)
            .tol_gap_rel(config.tol_gap_rel)
            .tol_feas(config.tol_feas)
            .build()
            .map_err(|e| format!("invalid solver settings: {e:?}"))?;

        let mut solver = DefaultSolver::new(&p, &self.q, &a, &b, &cones, settings);
        solver.solve();

        let status = solver.solution.status;
        let iterations = solver.info.iterations;
        match status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => Ok(QpSolution {
                x: solver.solution.x.clone(),
                iterations,
                status: format!("{status:?}"),
            }),
            other => Err(format!("solver stopped with status {other:?} after {iterations} iterations")),
        }
    }

    /// Upper triangle of `P` in CSC form, as Clarabel expects.
    fn upper_triangle(&self) -> CscMatrix<f64> {
        let n = self.n;
        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for col in 0..n {
            for row in 0..=col {
                let v = self.p[row * n + col];
                if v != 0.0 {
                    rowval.push(row);
                    nzval.push(v);
                }
            }
            colptr.push(rowval.len());
        }
        CscMatrix::new(n, n, colptr, rowval, nzval)
    }
}

/// Dense rows to CSC, skipping exact zeros.
fn csc_from_rows(rows: &[&Vec<f64>], ncols: usize) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(ncols + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for col in 0..ncols {
        for (r, row) in rows.iter().enumerate() {
            let v = row[col];
            if v != 0.0 {
                rowval.push(r);
                nzval.push(v);
            }
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(rows.len(), ncols, colptr, rowval, nzval)
}
