//! Line-based terminal adapter: every stdin line is one turn of one session.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ussd_engine::SessionLoop;

use crate::error::AppError;

/// Dial in with an empty input, then feed stdin lines until EOF or cancel.
///
/// A failed turn is logged and the session continues with the next line. A
/// terminal screen ends the call; the next line dials in again.
pub async fn run_interactive(
    session: &SessionLoop,
    session_id: &str,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    turn(session, session_id, "", &mut stdout).await?;
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("stdin closed");
            break;
        };
        turn(session, session_id, &line, &mut stdout).await?;
    }

    session.shutdown().await?;
    Ok(())
}

async fn turn<W: Write>(
    session: &SessionLoop,
    session_id: &str,
    input: &str,
    out: &mut W,
) -> Result<(), AppError> {
    match session.handle(session_id, input).await {
        Ok(screen) => {
            writeln!(out, "{}", screen.content)?;
            if screen.terminal {
                writeln!(out, "--")?;
            }
            out.flush()?;
        }
        Err(e) => warn!(session_id, error = %e, "turn failed"),
    }
    Ok(())
}
