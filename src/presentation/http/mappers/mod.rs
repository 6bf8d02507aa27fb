use poem::http::StatusCode;

use crate::{
    domain::{
        errors::DomainError,
        models::{HistoryPage, HistoryRecord, Message},
    },
    presentation::http::{
        requests::SendMessageRequestDto,
        responses::{HistoryPageDto, HistoryRecordDto},
    },
};

pub fn map_message(dto: SendMessageRequestDto) -> Message {
    Message {
        sender: dto.sender,
        msg_type: dto.msg_type,
        content: dto.content,
        title: dto.title,
        recipients: dto.tos,
        cc_recipients: dto.ccs,
        extra: dto.extra,
        synchronous: dto.sync,
        simple: dto.simple,
        mentions: dto.ats,
        mentioned_phones: dto.at_mobiles,
        ..Default::default()
    }
}

pub fn map_history(record: HistoryRecord) -> HistoryRecordDto {
    HistoryRecordDto {
        id: record.id,
        message: record.message,
        err: record.err,
        req: record.req,
        resp: record.resp,
        status: record.status,
        received_at: record.received_at,
        created_at: record.created_at,
    }
}

pub fn map_history_page(page: HistoryPage) -> HistoryPageDto {
    HistoryPageDto {
        count: page.count,
        list: page.list.into_iter().map(map_history).collect(),
    }
}

pub fn status_code(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
        DomainError::UnknownSender(_) => StatusCode::NOT_FOUND,
        DomainError::UnsupportedCapability { .. } => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::AlreadyExists(_) => StatusCode::CONFLICT,
        DomainError::Provider(_) | DomainError::InternalFault(_) | DomainError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        DomainError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn domain_error(err: DomainError) -> poem::Error {
    poem::Error::from_string(err.to_string(), status_code(&err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_map_onto_the_message() {
        let dto = SendMessageRequestDto {
            sender: "bot".to_string(),
            msg_type: "text".to_string(),
            content: "hi".to_string(),
            title: String::new(),
            tos: vec!["a".to_string()],
            ccs: vec![],
            extra: String::new(),
            sync: true,
            simple: true,
            ats: vec!["u1".to_string()],
            at_mobiles: vec!["133".to_string()],
        };
        let message = map_message(dto);
        assert_eq!(message.recipients, vec!["a"]);
        assert!(message.synchronous);
        assert_eq!(message.mentions, vec!["u1"]);
        assert_eq!(message.mentioned_phones, vec!["133"]);
    }

    #[test]
    fn errors_map_to_http_statuses() {
        assert_eq!(status_code(&DomainError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_code(&DomainError::UnknownSender("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&DomainError::AlreadyExists("x".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_code(&DomainError::ShuttingDown),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
