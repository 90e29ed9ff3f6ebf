use crate::codec::DefaultCodec;
use crate::error::{LimiterError, Result};
use crate::limiter::limit_midi_bytes;
use crate::model::config::ServeArgs;
use crate::model::velocity::VelocityRange;
use crate::util::{INDEX_TEMPLATE, parse_bound, render_index};
use axum::Router;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

pub const MIDI_MIME: &str = "audio/midi";
const DOWNLOAD_DISPOSITION: &str = "attachment; filename=\"limited.mid\"";

/// Read-only state shared by every request.
#[derive(Debug)]
pub struct AppState {
    index: String,
    defaults: VelocityRange,
    max_upload_bytes: usize,
    codec: DefaultCodec,
}

impl AppState {
    pub fn new(config: &ServeArgs) -> Self {
        let defaults = config.velocity.range();
        Self {
            index: render_index(INDEX_TEMPLATE, defaults),
            defaults,
            max_upload_bytes: config.max_upload_bytes,
            codec: DefaultCodec::default(),
        }
    }

    fn multipart_error(&self, e: MultipartError) -> LimiterError {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            LimiterError::PayloadTooLarge {
                limit: self.max_upload_bytes,
            }
        } else {
            LimiterError::Multipart(e.body_text())
        }
    }
}

struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
}

impl Upload {
    /// Browsers still send the file part when nothing was chosen, with no name and no content.
    fn is_empty(&self) -> bool {
        self.file_name.as_deref().is_none_or(str::is_empty) && self.bytes.is_empty()
    }
}

#[derive(Default)]
struct ProcessForm {
    upload: Option<Upload>,
    min_v: Option<String>,
    max_v: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/process", post(process))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(Arc::new(state))
}

pub async fn serve(config: ServeArgs) -> anyhow::Result<()> {
    let defaults = config.velocity.range();
    if !defaults.is_well_formed() {
        warn!(
            "Default velocity range [{}..={}] is outside 1..=127 or inverted, results will saturate..!",
            defaults.min, defaults.max
        );
    }

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    info!(
        "Listening on http://{} (defaults: [{}..={}], upload limit: {} bytes)..!",
        addr, defaults.min, defaults.max, config.max_upload_bytes
    );

    axum::serve(listener, router(AppState::new(&config)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, exiting..!");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => warn!("Ctrl-C received, shutting down..!"),
        Err(e) => {
            warn!("Unable to listen for Ctrl-C ({}), running until killed..!", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index.clone())
}

async fn process(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    match limit_upload(&state, multipart).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Rejected upload with {}: {}..!", e.status(), e);
            e.into_response()
        }
    }
}

async fn limit_upload(state: &AppState, mut multipart: Multipart) -> Result<Response> {
    let mut form = ProcessForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| state.multipart_error(e))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("midi_file") => {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(|e| state.multipart_error(e))?;
                form.upload = Some(Upload { file_name, bytes });
            }
            Some("min_v") => {
                form.min_v = Some(field.text().await.map_err(|e| state.multipart_error(e))?);
            }
            Some("max_v") => {
                form.max_v = Some(field.text().await.map_err(|e| state.multipart_error(e))?);
            }
            other => debug!("Ignoring unexpected form field {:?}..!", other),
        }
    }

    let upload = match form.upload {
        Some(upload) if !upload.is_empty() => upload,
        _ => return Err(LimiterError::MissingFile),
    };

    let range = VelocityRange::new(
        bound_or_default("min_v", form.min_v.as_deref(), state.defaults.min)?,
        bound_or_default("max_v", form.max_v.as_deref(), state.defaults.max)?,
    );

    let (out, report) = limit_midi_bytes(&state.codec, &upload.bytes, range)?;

    info!(
        "Limited '{}' ({} bytes) into [{}..={}]: {} of {} note-on(s) changed..!",
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        upload.bytes.len(),
        range.min,
        range.max,
        report.changed(),
        report.note_ons()
    );

    Ok((
        [
            (header::CONTENT_TYPE, MIDI_MIME),
            (header::CONTENT_DISPOSITION, DOWNLOAD_DISPOSITION),
        ],
        out,
    )
        .into_response())
}

fn bound_or_default(field: &'static str, raw: Option<&str>, default: i64) -> Result<i64> {
    match raw {
        Some(raw) => parse_bound(field, raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use midly::num::{u4, u7, u15, u28};
    use midly::{MetaMessage, MidiMessage, Smf, TrackEvent, TrackEventKind};
    use tower::ServiceExt;

    const BOUNDARY: &str = "limiter-test-boundary";

    enum Part<'a> {
        File(&'a str, &'a [u8]),
        Text(&'a str, &'a str),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File(file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"midi_file\"; filename=\"{}\"\r\nContent-Type: audio/midi\r\n\r\n",
                            file_name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                            name, value
                        )
                        .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn app() -> Router {
        router(AppState::new(&ServeArgs::default()))
    }

    async fn post_process(app: Router, parts: &[Part<'_>]) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();

        app.oneshot(request).await.unwrap()
    }

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    fn song(velocities: &[u8]) -> Vec<u8> {
        let mut smf = Smf::new(midly::Header::new(
            midly::Format::SingleTrack,
            midly::Timing::Metrical(u15::new(480)),
        ));

        let mut track: Vec<TrackEvent<'static>> = velocities
            .iter()
            .enumerate()
            .map(|(i, &vel)| TrackEvent {
                delta: u28::new(120 * i as u32),
                kind: TrackEventKind::Midi {
                    channel: u4::new(0),
                    message: MidiMessage::NoteOn {
                        key: u7::new(60 + i as u8),
                        vel: u7::new(vel),
                    },
                },
            })
            .collect();
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);

        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    fn note_on_velocities(bytes: &[u8]) -> Vec<u8> {
        let smf = Smf::parse(bytes).unwrap();
        smf.tracks
            .iter()
            .flatten()
            .filter_map(|event| match event.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { vel, .. },
                    ..
                } => Some(vel.as_int()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn index_serves_form() {
        env_logger::try_init().unwrap_or(());

        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );

        let body = body_bytes(response).await;
        let page = std::str::from_utf8(&body).unwrap();
        assert!(page.contains(r#"id="min_v" value="40""#));
        assert!(page.contains(r#"id="max_v" value="100""#));
    }

    #[tokio::test]
    async fn process_returns_limited_file() {
        env_logger::try_init().unwrap_or(());

        let input = song(&[10, 64, 120, 0]);
        let response = post_process(
            app(),
            &[
                Part::File("take.mid", &input),
                Part::Text("min_v", "40"),
                Part::Text("max_v", "100"),
            ],
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], MIDI_MIME);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"limited.mid\""
        );

        let body = body_bytes(response).await;
        assert_eq!(note_on_velocities(&body), vec![40, 64, 100, 0]);
    }

    #[tokio::test]
    async fn fields_may_come_before_the_file() {
        env_logger::try_init().unwrap_or(());

        let input = song(&[1, 127]);
        let response = post_process(
            app(),
            &[
                Part::Text("max_v", " 90 "),
                Part::Text("min_v", "+30"),
                Part::File("take.mid", &input),
            ],
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        assert_eq!(note_on_velocities(&body), vec![30, 90]);
    }

    #[tokio::test]
    async fn missing_bounds_use_defaults() {
        env_logger::try_init().unwrap_or(());

        let input = song(&[5, 126]);
        let response = post_process(app(), &[Part::File("take.mid", &input)]).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        assert_eq!(note_on_velocities(&body), vec![40, 100]);
    }

    #[tokio::test]
    async fn bounds_are_not_range_checked() {
        env_logger::try_init().unwrap_or(());

        let input = song(&[5, 64, 126]);
        let response = post_process(
            app(),
            &[
                Part::File("take.mid", &input),
                Part::Text("min_v", "-50"),
                Part::Text("max_v", "300"),
            ],
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        assert_eq!(note_on_velocities(&body), vec![5, 64, 126]);
    }

    #[tokio::test]
    async fn missing_file_is_a_bad_request() {
        env_logger::try_init().unwrap_or(());

        let response = post_process(
            app(),
            &[Part::Text("min_v", "40"), Part::Text("max_v", "100")],
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_bytes(response).await, "File missing");
    }

    #[tokio::test]
    async fn unselected_file_is_a_bad_request() {
        env_logger::try_init().unwrap_or(());

        let response = post_process(app(), &[Part::File("", b"")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_integer_bound_is_a_bad_request() {
        env_logger::try_init().unwrap_or(());

        // Not MIDI either: a 400 here proves the bound was checked before decoding.
        let response = post_process(
            app(),
            &[
                Part::File("take.mid", b"not midi"),
                Part::Text("min_v", "abc"),
                Part::Text("max_v", "100"),
            ],
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_bytes(response).await;
        assert!(std::str::from_utf8(&body).unwrap().starts_with("Invalid values"));
    }

    #[tokio::test]
    async fn malformed_midi_is_unprocessable() {
        env_logger::try_init().unwrap_or(());

        let response = post_process(
            app(),
            &[
                Part::File("take.mid", b"this is not a midi file"),
                Part::Text("min_v", "40"),
                Part::Text("max_v", "100"),
            ],
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_bytes(response).await;
        assert!(
            std::str::from_utf8(&body)
                .unwrap()
                .starts_with("Malformed MIDI input")
        );
    }

    #[tokio::test]
    async fn truncated_track_is_unprocessable() {
        env_logger::try_init().unwrap_or(());

        let mut input = song(&[10, 64, 120]);
        input.truncate(input.len() - 5);

        let response = post_process(
            app(),
            &[
                Part::File("take.mid", &input),
                Part::Text("min_v", "40"),
                Part::Text("max_v", "100"),
            ],
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        env_logger::try_init().unwrap_or(());

        let app = router(AppState::new(&ServeArgs {
            max_upload_bytes: 256,
            ..ServeArgs::default()
        }));
        let input = vec![0u8; 4096];
        let response = post_process(app, &[Part::File("huge.mid", &input)]).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn get_on_process_is_not_allowed() {
        env_logger::try_init().unwrap_or(());

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/process")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
