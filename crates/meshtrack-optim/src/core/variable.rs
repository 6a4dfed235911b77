//! Parameter blocks: vertex positions, translations and axis-angle rotations.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("parameter block has {got} values, expected {expected}")]
    WrongGlobalSize { expected: usize, got: usize },

    #[error("update has {got} values, expected {expected}")]
    WrongLocalSize { expected: usize, got: usize },
}

/// Parameterization of a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariableType {
    /// Plain vector of the given size.
    Euclidean(usize),
    /// Axis-angle vector. Updated additively, like the rotations of the tracking energy.
    AngleAxis,
}

impl VariableType {
    /// Number of stored values.
    pub fn global_dim(&self) -> usize {
        match self {
            VariableType::Euclidean(n) => *n,
            VariableType::AngleAxis => 3,
        }
    }

    /// Number of columns the variable occupies in a Jacobian.
    pub fn local_dim(&self) -> usize {
        self.global_dim()
    }

    /// `values <- values + delta`.
    pub fn apply_plus(&self, values: &mut [f64], delta: &[f64]) -> Result<(), ParamError> {
        if values.len() != self.global_dim() {
            return Err(ParamError::WrongGlobalSize {
                expected: self.global_dim(),
                got: values.len(),
            });
        }
        if delta.len() != self.local_dim() {
            return Err(ParamError::WrongLocalSize {
                expected: self.local_dim(),
                got: delta.len(),
            });
        }
        values.iter_mut().zip(delta).for_each(|(x, d)| *x += d);
        Ok(())
    }
}

/// A named parameter block.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub var_type: VariableType,
    pub values: Vec<f64>,
    /// Fixed variables are read by factors but never updated.
    pub fixed: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, var_type: VariableType, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            var_type,
            values,
            fixed: false,
        }
    }

    pub fn euclidean(name: impl Into<String>, dim: usize) -> Self {
        Self::new(name, VariableType::Euclidean(dim), vec![0.0; dim])
    }

    pub fn angle_axis(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::AngleAxis, vec![0.0; 3])
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    #[inline]
    pub fn global_dim(&self) -> usize {
        self.var_type.global_dim()
    }

    #[inline]
    pub fn local_dim(&self) -> usize {
        self.var_type.local_dim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims() {
        assert_eq!(VariableType::Euclidean(2).global_dim(), 2);
        assert_eq!(VariableType::AngleAxis.global_dim(), 3);
        assert_eq!(VariableType::AngleAxis.local_dim(), 3);
    }

    #[test]
    fn test_apply_plus() -> Result<(), ParamError> {
        let mut values = vec![1.0, -2.0, 3.0];
        VariableType::AngleAxis.apply_plus(&mut values, &[0.5, 1.5, -0.5])?;
        assert_eq!(values, vec![1.5, -0.5, 2.5]);
        Ok(())
    }

    #[test]
    fn test_apply_plus_size_errors() {
        let mut values = vec![0.0; 2];
        assert_eq!(
            VariableType::AngleAxis.apply_plus(&mut values, &[0.0; 3]),
            Err(ParamError::WrongGlobalSize {
                expected: 3,
                got: 2
            })
        );
        assert_eq!(
            VariableType::Euclidean(2).apply_plus(&mut values, &[0.0; 3]),
            Err(ParamError::WrongLocalSize {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn test_variable_builders() {
        let vertex = Variable::euclidean("vertex_0", 3);
        assert_eq!(vertex.values, vec![0.0; 3]);
        assert!(!vertex.fixed);

        let rot = Variable::angle_axis("rotation").with_fixed(true);
        assert_eq!(rot.local_dim(), 3);
        assert!(rot.fixed);
    }
}
