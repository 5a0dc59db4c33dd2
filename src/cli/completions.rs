use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    dexgraph completions bash > ~/.bash_completion.d/dexgraph\n\n\
                  Generate zsh completions:\n    dexgraph completions zsh > ~/.zfunc/_dexgraph\n\n\
                  Generate fish completions:\n    dexgraph completions fish > ~/.config/fish/completions/dexgraph.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
