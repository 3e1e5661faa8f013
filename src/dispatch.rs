//! Transport boundary: every network call and redirect the engine issues goes through a
//! [`Dispatcher`].
//!
//! The engine never talks to an HTTP stack directly. Callers provide an implementation
//! (typically behind `Arc<D>` where `D: Dispatcher`) and the flows hand it fully resolved
//! [`DispatchRequest`]s. [`ReqwestDispatcher`] covers server-side use, while
//! [`SimulatedDispatcher`] answers from scripted responses so flows can be exercised without a
//! network.

// self
use crate::{_prelude::*, config::ContentType, error::TransportError, obs};

/// Parsed response body: a string-keyed JSON object.
pub type Response = Map<String, Value>;

/// Boxed future returned by [`Dispatcher::dispatch`].
pub type DispatchFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Response, TransportError>> + 'a + Send>>;

/// How a request reaches its endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// Full navigation to `url` with the payload as its query string.
	Href,
	/// `GET` with the payload as query pairs.
	Get,
	/// `POST` with the payload as the body.
	Post,
}
impl Method {
	/// Returns the wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Href => "HREF",
			Method::Get => "GET",
			Method::Post => "POST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully resolved outgoing request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
	/// Dispatch method.
	pub method: Method,
	/// Endpoint URL without the payload.
	pub url: String,
	/// Wire-form payload pairs.
	pub payload: Vec<(String, String)>,
	/// Body encoding for [`Method::Post`].
	pub content_type: ContentType,
}
impl DispatchRequest {
	/// Target URL with the payload appended as a query string.
	pub fn href(&self) -> Result<Url, url::ParseError> {
		let mut url = Url::parse(&self.url)?;

		if !self.payload.is_empty() {
			url.query_pairs_mut().extend_pairs(self.payload.iter());
		}

		Ok(url)
	}

	/// Returns the payload value for `name`.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.payload.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
	}

	/// JSON object view of the payload.
	pub fn payload_json(&self) -> Response {
		self.payload.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()
	}
}

/// Abstraction over whatever performs redirects and HTTP calls.
///
/// Implementations must be `Send + Sync + 'static` so one instance can back several clients,
/// and their futures must be `Send` so flows can hop executors.
pub trait Dispatcher
where
	Self: 'static + Send + Sync,
{
	/// Executes `request`, resolving with the parsed JSON body.
	///
	/// `HREF` dispatches navigate away; implementations that cannot navigate resolve with an
	/// empty response.
	fn dispatch(&self, request: DispatchRequest) -> DispatchFuture<'_>;
}

/// [`Dispatcher`] backed by [`ReqwestClient`].
///
/// Redirects are not followed: OAuth endpoints answer directly rather than delegating to
/// another URI. Configure any custom client passed to [`ReqwestDispatcher::with_client`] the
/// same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestDispatcher(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestDispatcher {
	/// Builds a dispatcher with redirect following disabled.
	pub fn new() -> Result<Self, ReqwestError> {
		ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build().map(Self)
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher for ReqwestDispatcher {
	fn dispatch(&self, request: DispatchRequest) -> DispatchFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			obs::debug_dispatch(request.method.as_str(), &request.url);

			let builder = match request.method {
				Method::Href => return Ok(Response::new()),
				Method::Get => client.get(&request.url).query(&request.payload),
				Method::Post => match request.content_type {
					ContentType::Form => client.post(&request.url).form(&request.payload),
					ContentType::Json => client.post(&request.url).json(&request.payload_json()),
				},
			};
			let response = builder
				.header(reqwest::header::ACCEPT, "application/json")
				.send()
				.await
				.map_err(|e| TransportError::network(&request.url, e))?;
			let status = response.status();
			let bytes = response.bytes().await.map_err(|e| TransportError::network(&request.url, e))?;
			let body = serde_json::from_slice::<Value>(&bytes);

			if !status.is_success() {
				let response = match body {
					Ok(Value::Object(map)) => Some(map),
					_ => None,
				};

				return Err(TransportError::Status { status: status.as_u16(), response });
			}

			match body {
				Ok(Value::Object(map)) => Ok(map),
				Ok(_) => Err(TransportError::InvalidBody { source: None }),
				Err(_) if bytes.is_empty() => Ok(Response::new()),
				Err(e) => Err(TransportError::InvalidBody { source: Some(e) }),
			}
		})
	}
}

#[derive(Clone, Debug)]
enum Scripted {
	Ok(Response),
	Status(u16, Option<Response>),
}

/// Simulation-mode [`Dispatcher`]: records every request and answers from scripted responses.
///
/// `HREF` requests resolve with an empty response. Unscripted `GET`/`POST` URLs answer with
/// HTTP 404.
#[derive(Debug, Default)]
pub struct SimulatedDispatcher {
	requests: Mutex<Vec<DispatchRequest>>,
	responses: RwLock<HashMap<String, Scripted>>,
}
impl SimulatedDispatcher {
	/// Scripts a successful JSON response for `url`.
	pub fn respond(&self, url: impl Into<String>, response: Response) {
		self.responses.write().insert(url.into(), Scripted::Ok(response));
	}

	/// Scripts a failing HTTP status for `url`, optionally carrying a JSON body.
	pub fn fail(&self, url: impl Into<String>, status: u16, body: Option<Response>) {
		self.responses.write().insert(url.into(), Scripted::Status(status, body));
	}

	/// Every request dispatched so far, oldest first.
	pub fn requests(&self) -> Vec<DispatchRequest> {
		self.requests.lock().clone()
	}

	/// The most recent request, if any.
	pub fn last_request(&self) -> Option<DispatchRequest> {
		self.requests.lock().last().cloned()
	}
}
impl Dispatcher for SimulatedDispatcher {
	fn dispatch(&self, request: DispatchRequest) -> DispatchFuture<'_> {
		Box::pin(async move {
			obs::debug_dispatch(request.method.as_str(), &request.url);

			let scripted = match request.method {
				Method::Href => None,
				Method::Get | Method::Post => Some(
					self.responses
						.read()
						.get(&request.url)
						.cloned()
						.unwrap_or(Scripted::Status(404, None)),
				),
			};

			self.requests.lock().push(request);

			match scripted {
				None => Ok(Response::new()),
				Some(Scripted::Ok(response)) => Ok(response),
				Some(Scripted::Status(status, response)) =>
					Err(TransportError::Status { status, response }),
			}
		})
	}
}
