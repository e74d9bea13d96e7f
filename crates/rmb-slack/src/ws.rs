use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use rmb_core::{
    errors::Error,
    ports::{Connector, ReadEvent, TransportReader, TransportWriter},
    Result,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens websocket connections for the streaming session.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

struct WsReader {
    stream: SplitStream<WsStream>,
}

struct WsWriter {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportReader>, Box<dyn TransportWriter>)> {
        let (stream, _resp) = connect_async(url)
            .await
            .map_err(|e| Error::TransportConnect(e.to_string()))?;
        let (sink, stream) = stream.split();
        Ok((Box::new(WsReader { stream }), Box::new(WsWriter { sink })))
    }
}

#[async_trait]
impl TransportReader for WsReader {
    async fn read(&mut self) -> Result<ReadEvent> {
        loop {
            let Some(next) = self.stream.next().await else {
                return Ok(ReadEvent::Closed);
            };
            match next {
                // tungstenite reassembles partial frames internally, so a
                // text message is always a final fragment at this layer.
                Ok(Message::Text(text)) => {
                    return Ok(ReadEvent::Fragment { text, fin: true })
                }
                Ok(Message::Close(_)) => return Ok(ReadEvent::Closed),
                // Control and binary frames carry no protocol events.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_)) => {}
                Ok(Message::Frame(_)) => {}
                Err(e) => return Err(Error::Transport(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl TransportWriter for WsWriter {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sink
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| Error::Send(e.to_string()))
    }
}
