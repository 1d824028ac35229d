//! Compile-time constant folding for `const` declarations and enum variants
//!.

use crate::ast::{BinaryOp, Expr, Item, Literal, Module, UnaryOp};
use std::collections::HashMap;

/// Every name whose value is known at IL-generation time: enum variants and
/// `const` declarations, folded transitively against each other.
#[derive(Debug, Clone, Default)]
pub struct ConstEnv {
    values: HashMap<String, i64>,
}

impl ConstEnv {
    pub fn build(module: &Module) -> Self {
        let mut env = ConstEnv::default();

        for item in &module.items {
            if let Item::EnumDecl { variants, .. } = item {
                let mut next_value = 0i64;
                for (variant_name, explicit) in variants {
                    let value = explicit.unwrap_or(next_value);
                    env.values.insert(variant_name.clone(), value);
                    next_value = value + 1;
                }
            }
        }

        // `const` declarations may reference earlier consts/enum variants in
        // any order the parser preserved; re-pass until nothing new folds.
        let mut remaining: Vec<(&str, &Expr)> = module
            .items
            .iter()
            .filter_map(|item| match item {
                Item::ConstDecl { name, value, .. } => Some((name.as_str(), value)),
                _ => None,
            })
            .collect();
        loop {
            let mut progressed = false;
            let mut next_remaining = Vec::new();
            for (name, expr) in remaining {
                match env.eval(expr) {
                    Some(v) => {
                        env.values.insert(name.to_string(), v);
                        progressed = true;
                    }
                    None => next_remaining.push((name, expr)),
                }
            }
            if !progressed || next_remaining.is_empty() {
                break;
            }
            remaining = next_remaining;
        }

        env
    }

    pub fn lookup(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    /// Folds `expr` to a compile-time integer, or `None` if it reads
    /// something not known at this stage (a runtime variable, a call, ...).
    pub fn eval(&self, expr: &Expr) -> Option<i64> {
        match expr {
            Expr::Literal { value: Literal::Int(v), .. } => Some(*v),
            Expr::Literal { value: Literal::Bool(b), .. } => Some(*b as i64),
            Expr::Identifier { name, .. } => self.values.get(name).copied(),
            Expr::Unary { op, operand, .. } => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => Some(-v),
                    UnaryOp::Plus => Some(v),
                    UnaryOp::BitNot => Some(!v),
                    UnaryOp::Not => Some((v == 0) as i64),
                    UnaryOp::AddressOf => None,
                }
            }
            Expr::Binary { op, left, right, .. } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                match op {
                    BinaryOp::Add => Some(l + r),
                    BinaryOp::Sub => Some(l - r),
                    BinaryOp::Mul => Some(l * r),
                    BinaryOp::Div if r != 0 => Some(l / r),
                    BinaryOp::Mod if r != 0 => Some(l % r),
                    BinaryOp::And => Some(l & r),
                    BinaryOp::Or => Some(l | r),
                    BinaryOp::Xor => Some(l ^ r),
                    BinaryOp::Shl => Some(l << r),
                    BinaryOp::Shr => Some(l >> r),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;

    fn span() -> Span {
        Span::synthetic()
    }

    #[test]
    fn const_referencing_an_earlier_const_folds() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![
                Item::ConstDecl {
                    name: "BASE".to_string(),
                    is_exported: false,
                    value: crate::ast::int_lit(10, span()),
                    span: span(),
                },
                Item::ConstDecl {
                    name: "DERIVED".to_string(),
                    is_exported: false,
                    value: crate::ast::binary(BinaryOp::Add, crate::ast::ident("BASE", span()), crate::ast::int_lit(5, span()), span()),
                    span: span(),
                },
            ],
            span: span(),
        };
        let consts = ConstEnv::build(&module);
        assert_eq!(consts.lookup("DERIVED"), Some(15));
    }

    #[test]
    fn enum_variants_are_sequential_from_zero() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![Item::EnumDecl {
                name: "Color".to_string(),
                is_exported: false,
                variants: vec![("Red".to_string(), None), ("Green".to_string(), None), ("Blue".to_string(), Some(10))],
                span: span(),
            }],
            span: span(),
        };
        let consts = ConstEnv::build(&module);
        assert_eq!(consts.lookup("Red"), Some(0));
        assert_eq!(consts.lookup("Green"), Some(1));
        assert_eq!(consts.lookup("Blue"), Some(10));
    }
}
