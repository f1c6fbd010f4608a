use sprig::{ast::BinaryOp, Primitive, PrimitiveKind};

#[test]
fn promotes_mixed_operands() {
    let sum = Primitive::Int(2).binary(BinaryOp::Add, Primitive::Double(0.5));
    assert_eq!(sum, Ok(Primitive::Double(2.5)));
    let product = Primitive::Byte(3).binary(BinaryOp::Mul, Primitive::Short(4));
    assert_eq!(product, Ok(Primitive::Int(12)));
}

#[test]
fn integer_division_by_zero_is_an_error() {
    let err = Primitive::Int(1).binary(BinaryOp::Div, Primitive::Int(0));
    assert_eq!(err, Err("/ by zero".to_string()));
    let nan = Primitive::Double(1.0).binary(BinaryOp::Div, Primitive::Double(0.0));
    assert_eq!(nan, Ok(Primitive::Double(f64::INFINITY)));
}

#[test]
fn assignment_narrows_only_fitting_constants() {
    assert_eq!(
        Primitive::Int(100).assign_to(PrimitiveKind::Byte),
        Ok(Primitive::Byte(100))
    );
    assert!(Primitive::Int(1000).assign_to(PrimitiveKind::Byte).is_err());
    assert!(Primitive::Long(1).assign_to(PrimitiveKind::Int).is_err());
    assert_eq!(
        Primitive::Int(7).assign_to(PrimitiveKind::Double),
        Ok(Primitive::Double(7.0))
    );
}

#[test]
fn casts_truncate_floating_values() {
    assert_eq!(
        Primitive::Double(3.9).cast_to(PrimitiveKind::Int),
        Ok(Primitive::Int(3))
    );
    assert!(Primitive::Bool(true).cast_to(PrimitiveKind::Int).is_err());
}

#[test]
fn renders_whole_doubles_with_fraction() {
    assert_eq!(Primitive::Double(5.0).to_string(), "5.0");
    assert_eq!(Primitive::Int(5).to_string(), "5");
    assert_eq!(Primitive::Null.to_string(), "null");
}
