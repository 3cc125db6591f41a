//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted — [`Response::status`],
//! the response builder, or as a bare handler return value.
//!
//! ```rust
//! use trellis::{Response, Status};
//!
//! // status-only, no body
//! Response::status(Status::NoContent);
//!
//! // structured abort body: {"code":403,"message":"Forbidden"}
//! Response::abort(Status::Forbidden, "");
//! ```
//!
//! [`Response::status`]: crate::Response::status
//! [`Response::abort`]: crate::Response::abort

macro_rules! statuses {
    ( $( $variant:ident = $code:literal, $reason:literal; )+ ) => {
        /// An HTTP status code with its canonical reason phrase.
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        pub enum Status {
            $( $variant, )+
        }

        impl Status {
            /// The numeric status code.
            pub fn code(self) -> u16 {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            /// The canonical reason phrase (e.g. `"Not Found"`), used as the
            /// status line text and by the default 404/405 fallback bodies.
            pub fn reason(self) -> &'static str {
                match self {
                    $( Self::$variant => $reason, )+
                }
            }
        }
    };
}

statuses! {
    Continue = 100, "Continue";
    SwitchingProtocols = 101, "Switching Protocols";
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NoContent = 204, "No Content";
    ResetContent = 205, "Reset Content";
    PartialContent = 206, "Partial Content";
    MultipleChoices = 300, "Multiple Choices";
    MovedPermanently = 301, "Moved Permanently";
    Found = 302, "Found";
    SeeOther = 303, "See Other";
    NotModified = 304, "Not Modified";
    TemporaryRedirect = 307, "Temporary Redirect";
    PermanentRedirect = 308, "Permanent Redirect";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    PaymentRequired = 402, "Payment Required";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    NotAcceptable = 406, "Not Acceptable";
    RequestTimeout = 408, "Request Timeout";
    Conflict = 409, "Conflict";
    Gone = 410, "Gone";
    LengthRequired = 411, "Length Required";
    PreconditionFailed = 412, "Precondition Failed";
    ContentTooLarge = 413, "Content Too Large";
    UriTooLong = 414, "URI Too Long";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    RangeNotSatisfiable = 416, "Range Not Satisfiable";
    ExpectationFailed = 417, "Expectation Failed";
    ImATeapot = 418, "I'm a Teapot";
    MisdirectedRequest = 421, "Misdirected Request";
    UnprocessableContent = 422, "Unprocessable Content";
    TooEarly = 425, "Too Early";
    UpgradeRequired = 426, "Upgrade Required";
    PreconditionRequired = 428, "Precondition Required";
    TooManyRequests = 429, "Too Many Requests";
    RequestHeaderFieldsTooLarge = 431, "Request Header Fields Too Large";
    UnavailableForLegalReasons = 451, "Unavailable For Legal Reasons";
    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    BadGateway = 502, "Bad Gateway";
    ServiceUnavailable = 503, "Service Unavailable";
    GatewayTimeout = 504, "Gateway Timeout";
    HttpVersionNotSupported = 505, "HTTP Version Not Supported";
    InsufficientStorage = 507, "Insufficient Storage";
    LoopDetected = 508, "Loop Detected";
    NetworkAuthenticationRequired = 511, "Network Authentication Required";
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_reasons() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::NotFound.reason(), "Not Found");
        assert_eq!(Status::MethodNotAllowed.code(), 405);
        assert_eq!(u16::from(Status::PermanentRedirect), 308);
    }
}
