//! Blocking invocation of external collaborator programs.
//!
//! Collaborators (freezer, compiler) are run synchronously with no timeout:
//! a hang is a hang of the whole packaging run.

use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Run `cmd` to completion, feeding `input` on stdin and capturing stdout
/// and stderr.
///
/// Stdin is written from a scoped thread so a collaborator that streams
/// output before consuming all of its input cannot deadlock on a full pipe.
/// A collaborator that exits without reading its input is not an error here;
/// its exit status tells the caller what happened.
///
/// # Errors
///
/// Returns an error if the program cannot be spawned or waited on, or if
/// writing stdin fails for any reason other than a closed pipe.
pub fn run_with_stdin(cmd: &mut Command, input: &[u8]) -> std::io::Result<Output> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("child stdin was not captured"))?;

    std::thread::scope(|scope| {
        let writer = scope.spawn(move || {
            let result = stdin.write_all(input);
            drop(stdin);
            result
        });
        let output = child.wait_with_output()?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(std::io::Error::other("stdin writer thread panicked")),
        }
        Ok(output)
    })
}

/// Last `n` lines of a captured stream, lossily decoded.
///
/// Long compiler or freezer logs are cut down so error messages stay
/// readable.
pub fn tail_lines(bytes: &[u8], n: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
