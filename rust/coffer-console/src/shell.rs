//! Interactive line-based shell over a [`Console`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::Console;

const HELP: &str = "commands: bucket <name>, list, upload, refresh, sign-out, sign-in, show, help, quit";

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Bucket(String),
    List,
    Upload,
    Refresh,
    SignOut,
    SignIn,
    Show,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse a line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word {
            "bucket" => Ok(Self::Bucket(rest.to_string())),
            "list" | "retry" => Ok(Self::List),
            "upload" => Ok(Self::Upload),
            "refresh" => Ok(Self::Refresh),
            "sign-out" => Ok(Self::SignOut),
            "sign-in" => Ok(Self::SignIn),
            "show" => Ok(Self::Show),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command `{}`", other)),
        };

        Some(command)
    }
}

/// Run the shell until `quit` or end of input.
///
/// The console is loaded once before the first prompt. Every command that
/// changes state prints the rendered state afterwards.
pub async fn run<R, W>(console: &Console, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    console.load().await;
    output.write_all(console.render().as_bytes()).await?;
    output.write_all(format!("{}\n", HELP).as_bytes()).await?;

    let mut lines = input.lines();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ShellCommand::parse(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(message)) => {
                output
                    .write_all(format!("{}\n{}\n", message, HELP).as_bytes())
                    .await?;
                continue;
            }
        };

        match command {
            ShellCommand::Bucket(name) => console.set_bucket(&name),
            ShellCommand::List => console.list().await,
            ShellCommand::Upload => console.upload_test_object().await,
            ShellCommand::Refresh => console.refresh_identity().await,
            ShellCommand::SignOut => console.sign_out(),
            ShellCommand::SignIn => console.sign_in().await,
            ShellCommand::Show => {}
            ShellCommand::Help => {
                output.write_all(format!("{}\n", HELP).as_bytes()).await?;
                continue;
            }
            ShellCommand::Quit => break,
        }

        output.write_all(console.render().as_bytes()).await?;
    }

    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_commands() {
        assert_eq!(
            ShellCommand::parse("bucket  my photos "),
            Some(Ok(ShellCommand::Bucket("my photos".into())))
        );
        assert_eq!(ShellCommand::parse("list"), Some(Ok(ShellCommand::List)));
        assert_eq!(ShellCommand::parse("retry"), Some(Ok(ShellCommand::List)));
        assert_eq!(
            ShellCommand::parse(" sign-out"),
            Some(Ok(ShellCommand::SignOut))
        );
        assert_eq!(ShellCommand::parse("quit"), Some(Ok(ShellCommand::Quit)));
        assert_eq!(ShellCommand::parse("   "), None);
    }

    #[test]
    fn it_rejects_unknown_commands() {
        assert_eq!(
            ShellCommand::parse("delete everything"),
            Some(Err("unknown command `delete`".into()))
        );
    }
}
