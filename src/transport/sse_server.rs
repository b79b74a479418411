use crate::services::Analyzer;
use crate::tools::GitbackTools;
use anyhow::Result;
use rmcp::transport::sse_server::SseServer;
use std::net::SocketAddr;

pub struct SseServerApp {
    bind_addr: SocketAddr,
    analyzer: Analyzer,
}

impl SseServerApp {
    pub fn new(bind_addr: SocketAddr, analyzer: Analyzer) -> Self {
        Self {
            bind_addr,
            analyzer,
        }
    }

    pub async fn serve(self) -> Result<()> {
        let sse_server = SseServer::serve(self.bind_addr).await?;
        let analyzer = self.analyzer.clone();
        let cancellation_token =
            sse_server.with_service(move || GitbackTools::new(analyzer.clone()));

        // Wait for Ctrl+C signal to gracefully shutdown
        tokio::signal::ctrl_c().await?;

        cancellation_token.cancel();
        self.analyzer.shutdown().await;

        Ok(())
    }
}
