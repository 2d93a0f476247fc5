use tracing::debug;
use transponder_types::Value;

use crate::error::DispatchResult;
use crate::strategy::{Call, Handler, Interceptor};

/// Replaces a `Null` result with the method's declared default value.
pub struct DefaultValueAdvice;

impl Interceptor for DefaultValueAdvice {
    fn name(&self) -> &str {
        "default-value"
    }

    fn intercept(&self, call: &Call<'_>, next: &dyn Handler) -> DispatchResult<Value> {
        let value = next.invoke(call)?;
        match (value.is_null(), call.method.default_value()) {
            (true, Some(default)) => Ok(default.clone()),
            _ => Ok(value),
        }
    }
}

/// Runs the inner strategy inside an elevated-privilege driver scope.
///
/// The scope is left whether or not the inner strategy succeeds.
pub struct SudoAdvice;

impl Interceptor for SudoAdvice {
    fn name(&self) -> &str {
        "sudo"
    }

    fn intercept(&self, call: &Call<'_>, next: &dyn Handler) -> DispatchResult<Value> {
        let driver = call.driver();
        driver.enter_privileged()?;
        debug!(method = %call.method.key, "entered privileged scope");
        let result = next.invoke(call);
        driver.exit_privileged();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::strategy::testing::{Named, StubTarget};
    use transponder_driver::{Driver, DriverCall, Params};
    use transponder_types::{Marker, MethodDecl, ValueShape};

    struct NullHandler;

    impl Handler for NullHandler {
        fn name(&self) -> &str {
            "null"
        }

        fn invoke(&self, _call: &Call<'_>) -> DispatchResult<Value> {
            Ok(Value::Null)
        }
    }

    /// Issues a query so the privilege flag is observable, then fails.
    struct QueryThenFail;

    impl Handler for QueryThenFail {
        fn name(&self) -> &str {
            "query-then-fail"
        }

        fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
            call.driver().query("sql", "probe", &Params::new())?;
            Err(DispatchError::invocation("query-then-fail", "boom"))
        }
    }

    fn privileged_flags(target: &StubTarget) -> Vec<bool> {
        target
            .driver
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::Query { privileged, .. } => Some(privileged),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn default_value_replaces_null_only() {
        let target = StubTarget::new();
        let method = MethodDecl::getter("getTitle", ValueShape::Text)
            .marker(Marker::DefaultValue(Value::from("untitled")));

        let out = DefaultValueAdvice
            .intercept(&Call::new(&method, &[], &target), &NullHandler)
            .unwrap();
        assert_eq!(out, Value::from("untitled"));

        let out = DefaultValueAdvice
            .intercept(&Call::new(&method, &[], &target), &Named("set"))
            .unwrap();
        assert_eq!(out, Value::from("set"));
    }

    #[test]
    fn default_value_without_marker_passes_null() {
        let target = StubTarget::new();
        let method = MethodDecl::getter("getTitle", ValueShape::Text);
        let out = DefaultValueAdvice
            .intercept(&Call::new(&method, &[], &target), &NullHandler)
            .unwrap();
        assert!(out.is_null());
    }

    #[test]
    fn sudo_scope_is_left_on_error() {
        let target = StubTarget::new();
        let method = MethodDecl::new("purge").marker(Marker::Sudo);

        let err = SudoAdvice
            .intercept(&Call::new(&method, &[], &target), &QueryThenFail)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Invocation { .. }));

        // A query outside the advice runs unprivileged again.
        target.driver.query("sql", "after", &Params::new()).unwrap();
        assert_eq!(privileged_flags(&target), vec![true, false]);
    }
}
