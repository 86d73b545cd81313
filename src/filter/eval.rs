use crate::filter::ast::{BoolOp, Call, CmpOp, Expr, Literal};
use crate::filter::context::{ObjectContext, Operand};
use crate::types::Value;
use std::borrow::Cow;

/// Intermediate result of evaluating a node
enum Evaluated<'a> {
    Operand(Operand<'a>),
    Tuple(&'a [Literal]),
}

impl Evaluated<'_> {
    fn is_truthy(&self) -> bool {
        match self {
            Evaluated::Operand(Operand::Absent) => false,
            Evaluated::Operand(Operand::Value(value)) => value.is_truthy(),
            Evaluated::Operand(Operand::Attrs(map)) => !map.is_empty(),
            Evaluated::Tuple(items) => !items.is_empty(),
        }
    }

    fn is_absent(&self) -> bool {
        matches!(self, Evaluated::Operand(Operand::Absent))
    }
}

fn boolean<'a>(value: bool) -> Evaluated<'a> {
    Evaluated::Operand(Operand::Value(Cow::Owned(Value::Bool(value))))
}

/// Evaluate a compiled tree to a boolean for one object
pub(crate) fn evaluate(expr: &Expr, ctx: &ObjectContext<'_>) -> bool {
    eval(expr, ctx).is_truthy()
}

fn eval<'a>(expr: &'a Expr, ctx: &ObjectContext<'a>) -> Evaluated<'a> {
    match expr {
        Expr::Literal(literal) => Evaluated::Operand(Operand::Value(Cow::Owned(literal.to_value()))),
        Expr::Name(name) => Evaluated::Operand(ctx.lookup(name)),
        Expr::Tuple(items) => Evaluated::Tuple(items),
        Expr::Call(Call::IsClass(class)) => boolean(ctx.object.eclass == *class),
        Expr::Call(Call::IsKindOf(class)) => boolean(ctx.is_kind_of(class)),
        Expr::BoolOp(BoolOp::Not(inner)) => boolean(!eval(inner, ctx).is_truthy()),
        Expr::BoolOp(BoolOp::And(items)) => boolean(items.iter().all(|item| eval(item, ctx).is_truthy())),
        Expr::BoolOp(BoolOp::Or(items)) => boolean(items.iter().any(|item| eval(item, ctx).is_truthy())),
        Expr::Compare { op, left, right } => boolean(compare(*op, &eval(left, ctx), &eval(right, ctx))),
    }
}

/// Any comparison touching an absent operand is false, negated forms included
fn compare(op: CmpOp, left: &Evaluated<'_>, right: &Evaluated<'_>) -> bool {
    if left.is_absent() || right.is_absent() {
        return false;
    }
    match op {
        CmpOp::Eq => equals(left, right),
        CmpOp::NotEq => !equals(left, right),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => !contains(right, left),
    }
}

fn equals(left: &Evaluated<'_>, right: &Evaluated<'_>) -> bool {
    match (left, right) {
        (Evaluated::Operand(Operand::Attrs(_)), _) | (_, Evaluated::Operand(Operand::Attrs(_))) => false,
        (Evaluated::Operand(Operand::Value(a)), Evaluated::Operand(Operand::Value(b))) => a.loosely_equals(b),
        (Evaluated::Operand(Operand::Value(value)), Evaluated::Tuple(items))
        | (Evaluated::Tuple(items), Evaluated::Operand(Operand::Value(value))) => sequence_equals(value, items),
        (Evaluated::Tuple(a), Evaluated::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_value().loosely_equals(&y.to_value()))
        }
        _ => false,
    }
}

fn sequence_equals(value: &Value, items: &[Literal]) -> bool {
    match value {
        Value::List(values) => {
            values.len() == items.len()
                && values.iter().zip(items).all(|(v, item)| v.loosely_equals(&item.to_value()))
        }
        _ => false,
    }
}

fn contains(haystack: &Evaluated<'_>, needle: &Evaluated<'_>) -> bool {
    let Evaluated::Tuple(items) = haystack else {
        return false;
    };
    match needle {
        Evaluated::Operand(Operand::Value(value)) => items.iter().any(|item| value.loosely_equals(&item.to_value())),
        _ => false,
    }
}
