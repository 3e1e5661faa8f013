//! Canonical parameter-name table and the declared type of every name.

// self
use crate::_prelude::*;

macro_rules! def_parameters {
	($($variant:ident => $name:literal: $ty:ident,)+) => {
		/// Every protocol parameter name known to the engine.
		#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
		pub enum ParamName {
			$(
				#[doc = concat!("`", $name, "`")]
				$variant,
			)+
		}
		impl ParamName {
			/// All known names, in table order.
			pub const ALL: &'static [ParamName] = &[$(ParamName::$variant,)+];

			/// Wire name of the parameter.
			pub const fn as_str(self) -> &'static str {
				match self {
					$(ParamName::$variant => $name,)+
				}
			}

			/// Declared value type of the parameter.
			pub const fn parameter_type(self) -> ParameterType {
				match self {
					$(ParamName::$variant => ParameterType::$ty,)+
				}
			}

			/// Looks up a wire name; `None` for names outside the table.
			pub fn lookup(name: &str) -> Option<Self> {
				match name {
					$($name => Some(ParamName::$variant),)+
					_ => None,
				}
			}
		}
	};
}

/// Value type declared for a parameter name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterType {
	/// Plain string.
	String,
	/// Space-delimited on the wire, array in memory.
	StringArray,
	/// JSON number.
	Number,
	/// JSON boolean.
	Boolean,
	/// Opaque JSON value.
	Json,
	/// Name outside the table; values pass through unchecked.
	Untyped,
}
impl ParameterType {
	/// Returns the label used in diagnostics.
	pub const fn as_str(self) -> &'static str {
		match self {
			ParameterType::String => "string",
			ParameterType::StringArray => "string[]",
			ParameterType::Number => "number",
			ParameterType::Boolean => "boolean",
			ParameterType::Json => "json",
			ParameterType::Untyped => "untyped",
		}
	}
}
impl Display for ParameterType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

def_parameters! {
	AccessToken => "access_token": String,
	AcrValues => "acr_values": StringArray,
	Assertion => "assertion": String,
	Audience => "audience": String,
	Claims => "claims": Json,
	ClaimsLocales => "claims_locales": StringArray,
	ClientAssertion => "client_assertion": String,
	ClientAssertionType => "client_assertion_type": String,
	ClientId => "client_id": String,
	ClientSecret => "client_secret": String,
	Code => "code": String,
	CodeChallenge => "code_challenge": String,
	CodeChallengeMethod => "code_challenge_method": String,
	CodeVerifier => "code_verifier": String,
	DeviceCode => "device_code": String,
	Display => "display": String,
	Error => "error": String,
	ErrorDescription => "error_description": String,
	ErrorUri => "error_uri": String,
	ExpiresIn => "expires_in": Number,
	GrantType => "grant_type": String,
	IdToken => "id_token": String,
	IdTokenHint => "id_token_hint": String,
	Interval => "interval": Number,
	Iss => "iss": String,
	LoginHint => "login_hint": String,
	MaxAge => "max_age": Number,
	Nonce => "nonce": String,
	NotBeforePolicy => "not-before-policy": Number,
	Password => "password": String,
	PostLogoutRedirectUri => "post_logout_redirect_uri": String,
	Prompt => "prompt": StringArray,
	RedirectUri => "redirect_uri": String,
	RefreshExpiresIn => "refresh_expires_in": Number,
	RefreshToken => "refresh_token": String,
	Registration => "registration": Json,
	Request => "request": String,
	RequestUri => "request_uri": String,
	Resource => "resource": String,
	ResponseMode => "response_mode": String,
	ResponseType => "response_type": StringArray,
	Scope => "scope": StringArray,
	SessionState => "session_state": String,
	State => "state": String,
	Token => "token": String,
	TokenType => "token_type": String,
	TokenTypeHint => "token_type_hint": String,
	UiLocales => "ui_locales": StringArray,
	UserCode => "user_code": String,
	Username => "username": String,
}
impl Display for ParamName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Returns the declared type of `name`; unknown names are [`ParameterType::Untyped`].
pub fn type_of(name: &str) -> ParameterType {
	ParamName::lookup(name).map(ParamName::parameter_type).unwrap_or(ParameterType::Untyped)
}
