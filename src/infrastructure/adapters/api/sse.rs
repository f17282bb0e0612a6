//! Server-Sent Events 解码
//!
//! 用 `eventsource-stream` 把 HTTP 响应的字节流切分为事件，再解析为 `ReportEvent`。
//! 通道中断不重连，未以空行结束的残余事件直接丢弃。

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::stream::{Stream, StreamExt};

use super::dto::parse_report_event;
use crate::application::ports::{GatewayError, ReportEventStream};
use crate::domain::report::ReportEvent;

/// 把 SSE 事件转换为报告事件
///
/// `event: error` 且载荷不是 JSON 时，载荷本身作为错误描述
pub fn to_report_event(event: &Event) -> Result<ReportEvent, GatewayError> {
    match parse_report_event(&event.data) {
        Err(GatewayError::InvalidResponse(_)) if event.event == "error" => {
            Ok(ReportEvent::Error {
                message: event.data.clone(),
            })
        }
        other => other,
    }
}

fn map_stream_error(err: EventStreamError<GatewayError>) -> GatewayError {
    match err {
        EventStreamError::Transport(e) => e,
        other => GatewayError::StreamError(other.to_string()),
    }
}

/// 把字节流解码为报告事件流
pub fn decode_report_events<S, B>(bytes: S) -> ReportEventStream
where
    S: Stream<Item = Result<B, GatewayError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    bytes
        .eventsource()
        .map(|item| match item {
            Ok(event) => to_report_event(&event),
            Err(e) => Err(map_stream_error(e)),
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ReportSection;
    use futures_util::stream;

    type Chunk = Result<Vec<u8>, GatewayError>;

    async fn decode(chunks: Vec<&[u8]>) -> Vec<Result<ReportEvent, GatewayError>> {
        let chunks: Vec<Chunk> = chunks.into_iter().map(|c| Ok(c.to_vec())).collect();
        decode_report_events(stream::iter(chunks)).collect().await
    }

    fn summary(content: &str) -> Result<ReportEvent, GatewayError> {
        Ok(ReportEvent::Progress {
            section: ReportSection::Summary,
            content: content.to_string(),
        })
    }

    #[tokio::test]
    async fn test_decode_report_events() {
        let events = decode(vec![
            &b"data: {\"type\":\"progress\",\"tab\":\"summary\",\"content\":\"Hi\"}\n\n"[..],
            &b"data: {\"type\":\"compl"[..],
            &b"ete\"}\n\n"[..],
        ])
        .await;
        assert_eq!(events, vec![summary("Hi"), Ok(ReportEvent::Complete)]);
    }

    #[tokio::test]
    async fn test_decode_accepts_crlf_and_bare_cr() {
        let events = decode(vec![
            &b"data: {\"type\":\"progress\",\"tab\":\"summary\",\"content\":\"a\"}\r\n\r\n"[..],
            &b"data: {\"type\":\"progress\",\"tab\":\"summary\",\"content\":\"b\"}\r\r"[..],
            &b"data: {\"type\":\"complete\"}\n\n"[..],
        ])
        .await;
        assert_eq!(
            events,
            vec![summary("a"), summary("b"), Ok(ReportEvent::Complete)]
        );
    }

    #[tokio::test]
    async fn test_decode_skips_comments() {
        let events = decode(vec![
            &b": keep-alive\n\n"[..],
            &b"id: 7\ndata: {\"type\":\"complete\"}\n\n"[..],
        ])
        .await;
        assert_eq!(events, vec![Ok(ReportEvent::Complete)]);
    }

    #[tokio::test]
    async fn test_decode_keeps_split_utf8() {
        let text = "data: {\"type\":\"progress\",\"tab\":\"summary\",\"content\":\"é\"}\n\n";
        let bytes = text.as_bytes();
        let split = text.find('é').unwrap() + 1;
        let events = decode(vec![&bytes[..split], &bytes[split..]]).await;
        assert_eq!(events, vec![summary("é")]);
    }

    #[tokio::test]
    async fn test_unterminated_event_is_dropped() {
        // 连接在空行之前断开，不能当作完成
        let events = decode(vec![&b"data: {\"type\":\"complete\"}"[..]]).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_plain_error_event() {
        let events = decode(vec![&b"event: error\ndata: model overloaded\n\n"[..]]).await;
        assert_eq!(
            events,
            vec![Ok(ReportEvent::Error {
                message: "model overloaded".to_string()
            })]
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_surfaced() {
        let chunks: Vec<Chunk> = vec![
            Err(GatewayError::StreamError("reset".to_string())),
            Ok(b"data: {\"type\":\"complete\"}\n\n".to_vec()),
        ];
        let mut events = decode_report_events(stream::iter(chunks));
        assert_eq!(
            events.next().await,
            Some(Err(GatewayError::StreamError("reset".to_string())))
        );
    }
}
