//! TCP protocol between the pose-estimation client and the gait server.
//!
//! Length-delimited frames carrying bincode payloads.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::GaitError;
use crate::pose::Frame;
use crate::session::FrameReport;
use crate::view::View;

/// 1メッセージの上限（33点のランドマークにはこれで十分）
const MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Client → Server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Landmarks for one instant.
    Frame { frame: Frame },
    /// The estimator failed on the current image; nothing to analyse.
    PoseFailed,
    /// A new video or camera stream was opened; session state starts over.
    LoadSource,
    SetView { view: View },
}

/// Server → Client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Report(Box<FrameReport>),
    /// Frame dropped because its index repeats the previous one.
    Skipped { frame_index: Option<u64> },
}

pub type MessageStream = Framed<TcpStream, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream(stream: TcpStream) -> MessageStream {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec();
    Framed::new(stream, codec)
}

/// Send a serializable message (bincode + length prefix).
pub async fn send_message<T: Serialize>(
    stream: &mut MessageStream,
    msg: &T,
) -> anyhow::Result<()> {
    let data = bincode::serialize(msg).map_err(GaitError::from)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive and deserialize a message.
pub async fn recv_message<T: DeserializeOwned>(
    stream: &mut MessageStream,
) -> anyhow::Result<T> {
    match stream.next().await {
        Some(Ok(bytes)) => Ok(bincode::deserialize(&bytes).map_err(GaitError::from)?),
        Some(Err(e)) => Err(e.into()),
        None => Err(GaitError::ConnectionClosed.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::pose::{Landmark, LandmarkIndex};
    use crate::session::Session;
    use tokio::net::TcpListener;

    fn standing_frame() -> Frame {
        let mut lm = vec![Landmark::default(); LandmarkIndex::COUNT];
        lm[LandmarkIndex::LeftShoulder as usize] = Landmark::new(0.6, 0.3, 0.0, 0.9);
        lm[LandmarkIndex::LeftElbow as usize] = Landmark::new(0.6, 0.45, 0.0, 0.9);
        lm[LandmarkIndex::LeftWrist as usize] = Landmark::new(0.7, 0.45, 0.0, 0.9);
        lm[LandmarkIndex::LeftHip as usize] = Landmark::new(0.58, 0.6, 0.0, 0.9);
        Frame::new(lm, 100).with_media_time(0.5)
    }

    async fn connected_pair() -> (MessageStream, MessageStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, server) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (
            message_stream(client.unwrap()),
            message_stream(server.unwrap().0),
        )
    }

    #[tokio::test]
    async fn test_client_message_round_trip() {
        let (mut client, mut server) = connected_pair().await;
        let msgs = vec![
            ClientMessage::Frame {
                frame: standing_frame(),
            },
            ClientMessage::SetView { view: View::Left },
            ClientMessage::PoseFailed,
            ClientMessage::LoadSource,
        ];
        for msg in &msgs {
            send_message(&mut client, msg).await.unwrap();
        }
        for expected in &msgs {
            let got: ClientMessage = recv_message(&mut server).await.unwrap();
            assert_eq!(&got, expected);
        }
    }

    #[tokio::test]
    async fn test_report_round_trip() {
        let (mut client, mut server) = connected_pair().await;
        let mut session = Session::new(&AnalysisConfig::default());
        let report = session.process(&standing_frame()).unwrap();

        send_message(&mut server, &ServerMessage::Report(Box::new(report.clone())))
            .await
            .unwrap();
        let got: ServerMessage = recv_message(&mut client).await.unwrap();
        assert_eq!(got, ServerMessage::Report(Box::new(report)));
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let (client, mut server) = connected_pair().await;
        drop(client);
        let err = recv_message::<ClientMessage>(&mut server).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GaitError>(),
            Some(GaitError::ConnectionClosed)
        ));
    }
}
