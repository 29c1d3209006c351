// ABOUTME: End-to-end scripts exercised against the public host API

use emberscript::{run, Env, Value};

#[test]
fn test_fibonacci_via_recursive_function() {
    let result = run(
        "
        func fib(n) {
            if n < 2 {
                return n;
            }
            return fib(n - 1) + fib(n - 2);
        }
        fib(10);
        ",
    )
    .unwrap();
    assert_eq!(result, Value::Int32(55));
}

#[test]
fn test_closures_capture_enclosing_scope() {
    let result = run(
        "
        func make_adder(n) {
            func add(x) {
                return x + n;
            }
            return add;
        }
        var add5 = make_adder(5);
        add5(37);
        ",
    )
    .unwrap();
    assert_eq!(result, Value::Int32(42));
}

#[test]
fn test_for_in_over_array_sums_elements() {
    let result = run(
        "
        var total = 0;
        for item in [1, 2, 3, 4] {
            total += item;
        }
        total;
        ",
    )
    .unwrap();
    assert_eq!(result, Value::Int32(10));
}

#[test]
fn test_for_in_over_map_iterates_keys() {
    let result = run(
        r#"
        var count = 0;
        for key in {"a": 1, "b": 2} {
            count++;
        }
        count;
        "#,
    )
    .unwrap();
    assert_eq!(result, Value::Int32(2));
}

#[test]
fn test_array_and_map_indexing_and_assignment() {
    let result = run(
        r#"
        var xs = [1, 2, 3];
        xs[1] = 99;
        var m = {"k": 1};
        m["k"] = m["k"] + 1;
        xs[1] + m["k"];
        "#,
    )
    .unwrap();
    assert_eq!(result, Value::Int32(101));
}

#[test]
fn test_slice_of_array_and_string() {
    let result = run(
        r#"
        var xs = [1, 2, 3, 4, 5];
        xs[1:3][0] + xs[1:3][1];
        "#,
    )
    .unwrap();
    assert_eq!(result, Value::Int64(5));

    let word = run(
        r#"
        var s = "hello world";
        s[0:5];
        "#,
    )
    .unwrap();
    assert_eq!(word, Value::str("hello"));
}

#[test]
fn test_slice_assignment_replaces_sub_range() {
    let result = run(
        r#"
        var xs = [1, 2, 3, 4, 5];
        xs[1:3] = [9];
        xs;
        "#,
    )
    .unwrap();
    assert_eq!(result, Value::seq(vec![Value::Int64(1), Value::Int64(9), Value::Int64(4), Value::Int64(5)]));
}

#[test]
fn test_slice_assignment_on_string_is_unsupported() {
    let err = run(r#"var s = "hello"; s[0:2] = "x";"#).unwrap_err();
    assert_eq!(
        format!("{}", err),
        "type string does not support slice operation for assignment"
    );
}

#[test]
fn test_numeric_promotion_across_int_and_float() {
    assert_eq!(run("1 + 2;").unwrap(), Value::Int32(3));
    assert_eq!(run("1 + 2.5;").unwrap(), Value::Float64(3.5));
}

#[test]
fn test_string_concatenation_with_plus() {
    assert_eq!(run(r#""foo" + "bar";"#).unwrap(), Value::str("foobar"));
}

#[test]
fn test_index_out_of_range_reports_stable_message() {
    let err = run("var xs = [1]; xs[5];").unwrap_err();
    assert_eq!(format!("{}", err), "index out of range");
}

#[test]
fn test_invalid_slice_index_reports_stable_message() {
    let err = run("var xs = [1, 2, 3]; xs[2:1];").unwrap_err();
    assert_eq!(format!("{}", err), "invalid slice index");
}

#[test]
fn test_member_access_on_unsupported_type_reports_stable_message() {
    let err = run("var n = 1; n.length;").unwrap_err();
    assert_eq!(format!("{}", err), "type int64 does not support member operation");
}

#[test]
fn test_index_assign_on_unsupported_type_reports_stable_message() {
    let err = run(r#"var s = "abc"; s[0] = "z";"#).unwrap_err();
    assert_eq!(
        format!("{}", err),
        "type string does not support index operation for assignment"
    );
}

#[test]
fn test_parse_error_on_malformed_program() {
    let err = run("var = ;").unwrap_err();
    assert!(format!("{}", err).starts_with("Parse error"));
}

#[test]
fn test_break_and_continue_inside_for_loop() {
    let result = run(
        "
        var total = 0;
        for var i = 0; i < 10; i++ {
            if i == 5 {
                break;
            }
            if i % 2 == 0 {
                continue;
            }
            total += i;
        }
        total;
        ",
    )
    .unwrap();
    assert_eq!(result, Value::Int32(1 + 3));
}

#[test]
fn test_host_defined_function_and_binding_are_visible_to_script() {
    let env = Env::new();
    env.define("greeting", Value::str("hello")).unwrap();
    env.define_func("shout", Some(1), |args| match &args[0] {
        Value::Str(s) => Ok(Value::str(s.to_uppercase())),
        other => Err(emberscript::RuntimeError::InvalidOperation(format!(
            "expected string, got {}",
            other.type_name()
        ))),
    })
    .unwrap();
    let result = env.execute("shout(greeting);").unwrap();
    assert_eq!(result, Value::str("HELLO"));
}

#[test]
fn test_environment_destroy_then_get_returns_none() {
    let env = Env::new();
    env.define("x", Value::Int32(1)).unwrap();
    env.destroy();
    assert_eq!(env.get("x"), None);
    assert!(env.execute("x;").is_err());
}
