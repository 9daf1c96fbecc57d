//! Shell fragment emission and the runtime shim.
//!
//! A fragment is emitted as a composite literal of the runtime's shell
//! AST package, passed to `gengo_shell` (or its panic-on-error
//! variant) together with a parameter map carrying one reflected
//! pointer binding per free variable. The shim itself is emitted once
//! per generated file that contains any fragment.

use ebb_parser::ast::shell::{Shell, ShellCmd, ShellList, ShellSimpleCmd};
use ebb_parser::TokenKind;

use crate::expr::go_quote;
use crate::Printer;

// Go-side packages the generated shim leans on.
pub(crate) const RUNTIME_ENVIRON: &str = "ebb.dev/ebb/eval/environ";
pub(crate) const RUNTIME_SHELL: &str = "ebb.dev/ebb/eval/shell";
pub(crate) const RUNTIME_EXPR: &str = "ebb.dev/ebb/syntax/expr";
pub(crate) const RUNTIME_SRC: &str = "ebb.dev/ebb/syntax/src";
pub(crate) const RUNTIME_TOKEN: &str = "ebb.dev/ebb/syntax/token";

impl Printer<'_> {
    /// Emit the call that re-executes a fragment at run time.
    pub(crate) fn shell_call(&mut self, sh: &Shell) {
        if sh.elide_error {
            self.print("gengo_shell_elide(");
        } else {
            self.print("gengo_shell(");
        }
        let lit = shell_literal(sh);
        self.print(&lit);
        self.print(", gengo_shell_params{");
        if !sh.free_vars.is_empty() {
            self.indent += 1;
            for name in &sh.free_vars {
                self.newline();
                self.print(&format!(
                    "{}: reflect.ValueOf(&{}).Elem(),",
                    go_quote(name),
                    name
                ));
            }
            self.indent -= 1;
            self.newline();
        }
        self.print("})");
    }

    pub(crate) fn print_shell_shim(&mut self) {
        self.newline();
        self.newline();
        self.print("var _ = src.Pos{} // used in some expr.Shell prints");
        self.newline();
        self.print("var _ = token.Token(0)");
        self.newline();
        self.print(
            "var shellState = &shell.State{\n\tEnv:   environ.NewFrom(os.Environ()),\n\tAlias: environ.New(),\n}",
        );

        self.newline();
        self.newline();
        self.print(
            "func init() {\n\twd, err := os.Getwd()\n\tif err == nil {\n\t\tshellState.Env.Set(\"PWD\", wd)\n\t}\n}",
        );

        self.newline();
        self.newline();
        self.print(
            r#"func gengo_shell(e *expr.Shell, p gengo_shell_params) (string, error) {
	str, err := shell.Run(shellState, p, e)
	return str, err
}

func gengo_shell_elide(e *expr.Shell, p gengo_shell_params) string {
	str, err := gengo_shell(e, p)
	if err != nil {
		panic(err)
	}
	return str
}

type gengo_shell_params map[string]reflect.Value

func (p gengo_shell_params) Get(name string) string {
	if v, found := p[name]; found {
		vi := v.Interface()
		if s, ok := vi.(string); ok {
			return s
		}
		return fmt.Sprint(vi)
	}
	return shellState.Env.Get(name)
}

func (p gengo_shell_params) Set(name, value string) {
	v, found := p[name]
	if !found {
		v = reflect.ValueOf(&value).Elem()
		p[name] = v
	}
	if v.Kind() == reflect.String {
		v.SetString(value)
	} else {
		fmt.Sscan(value, v)
	}
}

func init() { shell.Init() }
"#,
        );
    }
}

/// Render a fragment as a Go composite literal of the runtime's shell
/// AST. The output must round-trip through the host language's parser.
pub(crate) fn shell_literal(sh: &Shell) -> String {
    let mut out = String::from("&expr.Shell{");
    if !sh.cmds.is_empty() {
        out.push_str("Cmds: []*expr.ShellList{");
        for (i, list) in sh.cmds.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            list_literal(list, &mut out);
        }
        out.push_str("}, ");
    }
    if sh.trap_out {
        out.push_str("TrapOut: true, ");
    }
    if sh.elide_error {
        out.push_str("ElideError: true, ");
    }
    if !sh.free_vars.is_empty() {
        out.push_str("FreeVars: []string{");
        for (i, name) in sh.free_vars.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&go_quote(name));
        }
        out.push_str("}, ");
    }
    trim_fields(&mut out);
    out.push('}');
    out
}

fn list_literal(list: &ShellList, out: &mut String) {
    out.push_str("&expr.ShellList{AndOr: []*expr.ShellAndOr{");
    for (i, andor) in list.andor.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str("&expr.ShellAndOr{Pipeline: []*expr.ShellPipeline{");
        for (j, pipeline) in andor.pipeline.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            out.push_str("&expr.ShellPipeline{");
            if pipeline.bang {
                out.push_str("Bang: true, ");
            }
            out.push_str("Cmd: []*expr.ShellCmd{");
            for (k, cmd) in pipeline.cmd.iter().enumerate() {
                if k > 0 {
                    out.push_str(", ");
                }
                cmd_literal(cmd, out);
            }
            out.push_str("}}");
        }
        out.push_str("}, ");
        if !andor.sep.is_empty() {
            out.push_str("Sep: []token.Token{");
            for (j, sep) in andor.sep.iter().enumerate() {
                if j > 0 {
                    out.push_str(", ");
                }
                out.push_str(token_name(*sep));
            }
            out.push_str("}, ");
        }
        if andor.background {
            out.push_str("Background: true, ");
        }
        trim_fields(out);
        out.push('}');
    }
    out.push_str("}}");
}

fn cmd_literal(cmd: &ShellCmd, out: &mut String) {
    match cmd {
        ShellCmd::Simple(simple) => {
            out.push_str("&expr.ShellCmd{SimpleCmd: ");
            simple_literal(simple, out);
            out.push('}');
        }
        ShellCmd::Subshell(list) => {
            out.push_str("&expr.ShellCmd{Subshell: ");
            list_literal(list, out);
            out.push('}');
        }
    }
}

fn simple_literal(simple: &ShellSimpleCmd, out: &mut String) {
    out.push_str("&expr.ShellSimpleCmd{");
    if !simple.assign.is_empty() {
        out.push_str("Assign: []expr.ShellAssign{");
        for (i, assign) in simple.assign.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&format!(
                "{{Key: {}, Value: {}}}",
                go_quote(&assign.key),
                go_quote(&assign.value)
            ));
        }
        out.push_str("}, ");
    }
    if !simple.redirect.is_empty() {
        out.push_str("Redirect: []*expr.ShellRedirect{");
        for (i, redirect) in simple.redirect.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str("&expr.ShellRedirect{");
            if let Some(n) = redirect.number {
                // a literal cannot be addressed, so the pointer is
                // produced by an immediately applied closure
                out.push_str(&format!(
                    "Number: func(v int) *int {{ return &v }}({}), ",
                    n
                ));
            }
            out.push_str(&format!(
                "Token: {}, Filename: {}}}",
                token_name(redirect.token),
                go_quote(&redirect.filename)
            ));
        }
        out.push_str("}, ");
    }
    if !simple.args.is_empty() {
        out.push_str("Args: []string{");
        for (i, arg) in simple.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&go_quote(arg));
        }
        out.push_str("}, ");
    }
    trim_fields(out);
    out.push('}');
}

fn token_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::LogicalAnd => "token.LogicalAnd",
        TokenKind::LogicalOr => "token.LogicalOr",
        TokenKind::Less => "token.Less",
        TokenKind::Greater => "token.Greater",
        TokenKind::TwoGreater => "token.TwoGreater",
        TokenKind::GreaterAnd => "token.GreaterAnd",
        TokenKind::AndGreater => "token.AndGreater",
        _ => "token.Unknown",
    }
}

/// Drop a trailing `, ` left by field emission.
fn trim_fields(out: &mut String) {
    if out.ends_with(", ") {
        out.truncate(out.len() - 2);
    }
}
