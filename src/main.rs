use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match kenshin_reader::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Kenshin Reader exited with an error");
            ExitCode::FAILURE
        }
    }
}
