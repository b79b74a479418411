use crate::services::Analyzer;
use crate::tools::GitbackTools;
use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

pub async fn run_stdio_server(analyzer: Analyzer) -> Result<()> {
    let service = GitbackTools::new(analyzer.clone());

    let server = service.serve(stdio()).await?;
    server.waiting().await?;

    // Let pending cache and summary writes land before exiting
    analyzer.shutdown().await;
    Ok(())
}
