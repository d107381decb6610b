use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "pyrun", about = "Run an interpreter script and report whether it succeeded", version)]
pub struct Cli {
    /// Script or module path handed to the interpreter.
    #[arg(value_name = "SCRIPT")]
    pub script: String,

    /// Arguments passed to the script verbatim.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Interpreter executable (overrides PYRUN_EXECUTABLE).
    #[arg(long)]
    pub executable: Option<String>,

    /// Interpreter type used to pick the default executable (python|r).
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Extra environment entry for the child, KEY=VALUE.
    /// Can be used multiple times; later entries win.
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", action = clap::ArgAction::Append)]
    pub env: Vec<String>,

    /// Only the exit status decides success; stderr output alone is not a failure.
    #[arg(long = "lenient-stderr")]
    pub lenient_stderr: bool,

    /// Debug logging on stderr.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
