use codeflow_debugger::{run_source, RunConfig, ScriptError};
use std::time::Duration;

fn run(code: &str) -> String {
    let outcome =
        run_source(code, &RunConfig::default(), Vec::new()).expect("writing to a Vec cannot fail");
    String::from_utf8(outcome.out).expect("output should be UTF-8")
}

#[cfg(test)]
mod semantics_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_print_formatting() {
        assert_eq!(
            run("print(1, 2.0, \"a\", [1, 'b'], (1,), None, True)"),
            "1 2.0 a [1, 'b'] (1,) None True\n"
        );
        assert_eq!(run("print(1, 2, sep=\"-\", end=\"!\")"), "1-2!");
        assert_eq!(run("print()"), "\n");
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("print(-7 // 2, -7 % 2, 7 / 2)"), "-4 1 3.5\n");
        assert_eq!(run("print(-(-3), ~1, 2 ** 10, 2 ** -1)"), "3 -2 1024 0.5\n");
        assert_eq!(run("print(True + 1, 1 << 4, 7 & 3, 5 ^ 1, 4 | 1)"), "2 16 3 4 5\n");
        assert_eq!(run("print(0.1 + 0.2, 1e20, 3.0 * 2)"), "0.30000000000000004 1e+20 6.0\n");
    }

    #[test]
    fn test_boolean_operators_return_operands() {
        assert_eq!(run("print(0 or 5, 2 and 0, not 1)"), "5 0 False\n");
        assert_eq!(run("print(1 < 2 < 3, 3 > 2 > 5)"), "True False\n");
        assert_eq!(run("print(\"y\" if 0 else \"n\")"), "n\n");
        assert_eq!(run("print(2 in [1, 2], 5 not in range(3), None is None)"), "True True True\n");
    }

    #[test]
    fn test_lists_are_shared() {
        let code = "def fill(a):\n    a[0] = 9\narr = [1, 2]\nfill(arr)\nprint(arr)\n";
        assert_eq!(run(code), "[9, 2]\n");
    }

    #[test]
    fn test_scopes() {
        let global = "count = 0\ndef bump():\n    global count\n    count += 1\nbump()\nbump()\nprint(count)\n";
        assert_eq!(run(global), "2\n");

        let local = "x = 1\ndef f():\n    x = 2\n    return x\nprint(f(), x)\n";
        assert_eq!(run(local), "2 1\n");
    }

    #[test]
    fn test_default_and_keyword_arguments() {
        let code = "def g(a, b=10):\n    return a + b\nprint(g(1), g(1, 2), g(b=3, a=4))\n";
        assert_eq!(run(code), "11 3 7\n");
    }

    #[test]
    fn test_slices() {
        assert_eq!(
            run("a = [0, 1, 2, 3, 4]\nprint(a[1:3], a[::-1], a[-2:], a[:10])"),
            "[1, 2] [4, 3, 2, 1, 0] [3, 4] [0, 1, 2, 3, 4]\n"
        );
        assert_eq!(run("a = [1, 2, 3]\na[0:2] = [9]\nprint(a)"), "[9, 3]\n");
        assert_eq!(run("print(\"hello\"[1:4])"), "ell\n");
    }

    #[test]
    fn test_loops() {
        let for_break = "for i in range(5):\n    if i == 3:\n        break\nelse:\n    print(\"no break\")\nprint(i)\n";
        assert_eq!(run(for_break), "3\n");

        let while_else = "n = 0\nwhile n < 2:\n    n += 1\nelse:\n    print(\"done\", n)\n";
        assert_eq!(run(while_else), "done 2\n");

        let growing = "a = [1]\nfor x in a:\n    if x < 3:\n        a.append(x + 1)\nprint(a)\n";
        assert_eq!(run(growing), "[1, 2, 3]\n");

        let skip = "total = 0\nfor i in range(6):\n    if i % 2:\n        continue\n    total += i\nprint(total)\n";
        assert_eq!(run(skip), "6\n");
    }

    #[test]
    fn test_builtins() {
        assert_eq!(
            run("print(sorted([3, 1, 2]), sorted([3, 1, 2], reverse=True), min([4, 2, 8]), max(4, 9, 1))"),
            "[1, 2, 3] [3, 2, 1] 2 9\n"
        );
        assert_eq!(
            run("print(sum([1, 2, 3]), list(reversed([1, 2])), enumerate([\"a\"]), len(range(2, 10, 3)))"),
            "6 [2, 1] [(0, 'a')] 3\n"
        );
        assert_eq!(
            run("print(int(\"7\") + 1, float(2), str(3) + \"x\", int(-2.5), abs(-4), bool([]))"),
            "8 2.0 3x -2 4 False\n"
        );
        assert_eq!(run("print(sorted([\"b\", \"a\"], key=len))"), "['b', 'a']\n");
    }

    #[test]
    fn test_list_methods() {
        let code = "a = [3]\na.append(1)\na.insert(0, 7)\na.extend([5, 5])\nprint(a, a.pop(), a.index(1), a.count(5), len(a))\n";
        assert_eq!(run(code), "[7, 3, 1, 5] 5 2 1 4\n");

        let code = "a = [3, 1, 2]\nb = a.copy()\na.sort()\nb.reverse()\nprint(a, b)\na.clear()\nprint(a)\n";
        assert_eq!(run(code), "[1, 2, 3] [2, 1, 3]\n[]\n");
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            run("s = \"ab\" * 2\nprint(s + \"c\", len(s), s[1], \"b\" in s)"),
            "ababc 4 b True\n"
        );
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn error_of(code: &str) -> String {
        let out = run(code);
        let last = out.lines().last().unwrap_or_default().to_string();
        assert!(last.starts_with("Error: "), "expected an error, got {:?}", out);
        last
    }

    #[test]
    fn test_runtime_error_messages() {
        assert_eq!(
            error_of("print(1 + \"a\")"),
            "Error: unsupported operand type(s) for +: 'int' and 'str'"
        );
        assert_eq!(
            error_of("print(\"a\" + 1)"),
            "Error: can only concatenate str (not \"int\") to str"
        );
        assert_eq!(
            error_of("x = [1, \"a\"]\nx.sort()"),
            "Error: '<' not supported between instances of 'str' and 'int'"
        );
        assert_eq!(
            error_of("print(undefined_name)"),
            "Error: name 'undefined_name' is not defined"
        );
        assert_eq!(error_of("x = 1 / 0"), "Error: division by zero");
        assert_eq!(
            error_of("x = 1 // 0"),
            "Error: integer division or modulo by zero"
        );
        assert_eq!(
            error_of("a, b = [1, 2, 3]"),
            "Error: too many values to unpack (expected 2)"
        );
        assert_eq!(
            error_of("a, b, c = (1, 2)"),
            "Error: not enough values to unpack (expected 3, got 2)"
        );
        assert_eq!(error_of("a = []\na.pop()"), "Error: pop from empty list");
        assert_eq!(error_of("print(max([]))"), "Error: max() arg is an empty sequence");
        assert_eq!(
            error_of("x = 5\nx.append(1)"),
            "Error: 'int' object has no attribute 'append'"
        );
        assert_eq!(error_of("print(2 ** 64)"), "Error: integer overflow");
    }

    #[test]
    fn test_call_errors() {
        let def = "def f(a):\n    return a\n";
        assert_eq!(
            error_of(&format!("{}f(1, 2)", def)),
            "Error: f() takes 1 positional argument but 2 were given"
        );
        assert_eq!(
            error_of(&format!("{}f()", def)),
            "Error: f() missing 1 required positional argument: 'a'"
        );
        assert_eq!(
            error_of(&format!("{}f(b=1)", def)),
            "Error: f() got an unexpected keyword argument 'b'"
        );
        assert_eq!(error_of("x = 3\nx()"), "Error: 'int' object is not callable");
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            error_of("for i in range(3):\nprint(i)"),
            "Error: expected an indented block after 'for' statement on line 1 (<string>, line 2)"
        );
        assert_eq!(error_of("x = 1\n    y = 2"), "Error: unexpected indent (<string>, line 2)");
        assert_eq!(error_of("return 1"), "Error: 'return' outside function (<string>, line 1)");
    }

    #[test]
    fn test_huge_slice_steps_stop_at_the_end() {
        assert_eq!(
            run("arr = [1, 2, 3]\nprint(arr[1::9223372036854775807], arr[1::-9223372036854775807], arr[::-9223372036854775807])"),
            "[2] [2] [3]\n"
        );
        assert_eq!(run("print(\"abc\"[::9223372036854775807])"), "a\n");
    }

    #[test]
    fn test_ranges_spanning_the_integer_range() {
        let code = "r = range(-9000000000000000000, 9000000000000000000, 6000000000000000000)\nprint(r[2], r[-1], len(r))\nprint(list(r))";
        assert_eq!(
            run(code),
            "3000000000000000000 3000000000000000000 3\n[-9000000000000000000, -3000000000000000000, 3000000000000000000]\n"
        );
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let parens = format!("arr = [{}1{}]", "(".repeat(60_000), ")".repeat(60_000));
        assert_eq!(
            error_of(&parens),
            "Error: too many nested parentheses (<string>, line 1)"
        );

        let negations = format!("x = {}1", "- ".repeat(60_000));
        assert_eq!(
            error_of(&negations),
            "Error: too many nested expressions (<string>, line 1)"
        );
    }

    #[test]
    fn test_oversized_sequences_are_refused() {
        assert_eq!(
            error_of("x = [0] * 10 ** 12"),
            "Error: cannot build a sequence of 1000000000000 items"
        );
        assert_eq!(
            error_of("x = list(range(10 ** 15))"),
            "Error: cannot build a sequence of 1000000000000000 items"
        );
        assert_eq!(
            error_of("s = \"ab\" * 10 ** 10"),
            "Error: cannot build a sequence of 20000000000 items"
        );
        assert_eq!(
            error_of("a = [1, 2]\na *= 10 ** 9"),
            "Error: cannot build a sequence of 2000000000 items"
        );

        let outcome = run_source("x = sorted(range(10 ** 12))", &RunConfig::default(), Vec::new())
            .expect("run should not fail");
        assert_eq!(outcome.error_kind, Some("MemoryError"));
        // lazy iteration is unaffected
        assert_eq!(run("for i in range(10 ** 12):\n    break\nprint(i)"), "0\n");
    }

    #[test]
    fn test_timeout() {
        let config = RunConfig {
            timeout: Some(Duration::from_secs(1)),
            ..RunConfig::default()
        };
        let outcome =
            run_source("while True:\n    pass\n", &config, Vec::new()).expect("run should not fail");
        let text = String::from_utf8(outcome.out).expect("output should be UTF-8");
        assert_eq!(text, "Error: execution timed out after 1 seconds\n");
        assert_eq!(outcome.error_kind, Some("TimeoutError"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ScriptError::Name("x".into()).kind(), "NameError");
        assert_eq!(
            ScriptError::syntax("invalid syntax", 4).to_string(),
            "invalid syntax (<string>, line 4)"
        );
    }
}
