use std::sync::Arc;

use crate::{
    errors::ArgumentError,
    types::{Instance, TypeInfo},
};

/// A single life-cycle method parameter, resolved from a component
pub trait MethodArg: Sized {
    fn param_type() -> TypeInfo;
    fn extract(instance: &Instance) -> Option<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> MethodArg for Arc<T> {
    fn param_type() -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn extract(instance: &Instance) -> Option<Self> {
        instance.view::<T>()
    }
}

/// The full parameter list of a life-cycle method
///
/// Implemented for `()` and tuples of `Arc<_>` up to six elements.
pub trait MethodArgs: Sized {
    fn param_types() -> Vec<TypeInfo>;
    fn extract(args: &[Instance]) -> Result<Self, ArgumentError>;
}

impl MethodArgs for () {
    fn param_types() -> Vec<TypeInfo> {
        Vec::new()
    }

    fn extract(args: &[Instance]) -> Result<Self, ArgumentError> {
        match args.len() {
            0 => Ok(()),
            actual => Err(ArgumentError::Count { expected: 0, actual }),
        }
    }
}

macro_rules! impl_method_args {
    ($count:expr; $($arg:ident => $index:tt),+) => {
        impl<$($arg: MethodArg),+> MethodArgs for ($($arg,)+) {
            fn param_types() -> Vec<TypeInfo> {
                vec![$($arg::param_type()),+]
            }

            fn extract(args: &[Instance]) -> Result<Self, ArgumentError> {
                if args.len() != $count {
                    return Err(ArgumentError::Count {
                        expected: $count,
                        actual: args.len(),
                    });
                }
                Ok(($(
                    $arg::extract(&args[$index]).ok_or_else(|| ArgumentError::Type {
                        index: $index,
                        expected: $arg::param_type().type_name,
                        actual: args[$index].info.type_name,
                    })?,
                )+))
            }
        }
    };
}

impl_method_args!(1; A => 0);
impl_method_args!(2; A => 0, B => 1);
impl_method_args!(3; A => 0, B => 1, C => 2);
impl_method_args!(4; A => 0, B => 1, C => 2, D => 3);
impl_method_args!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_method_args!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
