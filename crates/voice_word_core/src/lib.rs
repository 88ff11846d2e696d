pub mod domain;
pub mod ports;

pub use domain::{
    AudioFile, DownloadKind, LoginRequest, LoginResponse, Record, RecordListItem, RecordStatus,
    RecordUpdate, User, ALLOWED_AUDIO_EXTENSIONS,
};
pub use ports::{
    FormPart, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartForm, Navigator,
    PortError, PortResult, RequestBody, TokenStore,
};
