//! Abstract linear / mixed-integer problem.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Handle of a variable inside one [`LinearProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub kind: VarKind,
}

/// Sparse linear expression `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Value of the expression for a full assignment indexed by [`VarId`].
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

/// `expr (sense) rhs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDef {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl ConstraintDef {
    /// Amount by which `values` violates the constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => (lhs - self.rhs).abs(),
        }
    }
}

/// Problem class, used by gateways to pick or reject an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    /// Linear program
    Lp,
    /// Mixed-integer linear program (binary variables present)
    Milp,
}

impl std::fmt::Display for ProblemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemType::Lp => write!(f, "LP"),
            ProblemType::Milp => write!(f, "MILP"),
        }
    }
}

/// A minimization problem over bounded continuous and binary variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearProblem {
    variables: Vec<VariableDef>,
    constraints: Vec<ConstraintDef>,
    objective: LinearExpr,
}

impl LinearProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a continuous variable with bounds `[lower, upper]`.
    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.push_variable(VariableDef {
            name: name.into(),
            lower,
            upper,
            kind: VarKind::Continuous,
        })
    }

    /// Declare a 0/1 variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_variable(VariableDef {
            name: name.into(),
            lower: 0.0,
            upper: 1.0,
            kind: VarKind::Binary,
        })
    }

    fn push_variable(&mut self, def: VariableDef) -> VarId {
        self.variables.push(def);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(ConstraintDef {
            name: name.into(),
            expr,
            sense,
            rhs,
        });
    }

    /// Replace the (minimized) objective.
    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> Option<&VariableDef> {
        self.variables.get(id.0)
    }

    pub fn constraints(&self) -> &[ConstraintDef] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    pub fn problem_type(&self) -> ProblemType {
        if self.num_binaries() > 0 {
            ProblemType::Milp
        } else {
            ProblemType::Lp
        }
    }

    /// Check bounds, coefficients and variable references.
    pub fn validate(&self) -> Result<(), ModelError> {
        for v in &self.variables {
            if v.lower.is_nan() || v.upper.is_nan() || v.lower > v.upper {
                return Err(ModelError::InvalidBounds {
                    name: v.name.clone(),
                    lower: v.lower,
                    upper: v.upper,
                });
            }
        }
        self.check_expr(&self.objective, "objective")?;
        for c in &self.constraints {
            self.check_expr(&c.expr, &c.name)?;
            if !c.rhs.is_finite() {
                return Err(ModelError::NonFinite(format!("right-hand side of {}", c.name)));
            }
        }
        Ok(())
    }

    fn check_expr(&self, expr: &LinearExpr, location: &str) -> Result<(), ModelError> {
        for (var, coef) in &expr.terms {
            if var.0 >= self.variables.len() {
                return Err(ModelError::UnknownVariable {
                    location: location.to_string(),
                    var: var.0,
                });
            }
            if !coef.is_finite() {
                return Err(ModelError::NonFinite(location.to_string()));
            }
        }
        if !expr.constant.is_finite() {
            return Err(ModelError::NonFinite(location.to_string()));
        }
        Ok(())
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Largest constraint or bound violation of an assignment.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let bounds = self
            .variables
            .iter()
            .zip(values)
            .map(|(v, &x)| (v.lower - x).max(x - v.upper).max(0.0));
        let rows = self.constraints.iter().map(|c| c.violation(values));
        bounds.chain(rows).fold(0.0, f64::max)
    }
}
