//! Whole-file parses of realistic sources, checking shape and span
//! fidelity against the original bytes.

use gadfly_go_cst::ast::{Decl, Expr, Spec, Stmt};
use gadfly_go_cst::{inspect, parse_file, Node};

const SERVER: &str = r#"package server

import (
	"context"
	"errors"
	"fmt"
)

// ErrClosed is returned after Shutdown.
var ErrClosed = errors.New("server closed")

// Handler responds to a single request.
type Handler interface {
	Handle(ctx context.Context, req string) (string, error)
}

// Server dispatches requests to a handler.
type Server struct {
	handler Handler
	addr    string
	closed  bool
}

func New(handler Handler, addr string) *Server {
	return &Server{handler: handler, addr: addr}
}

func (s *Server) Dispatch(ctx context.Context, req string) (string, error) {
	if s.closed {
		return "", ErrClosed
	}
	resp, err := s.handler.Handle(ctx, req)
	if err != nil {
		return "", fmt.Errorf("dispatching request: %w", err)
	}
	return resp, nil
}

func (s *Server) Shutdown() {
	s.closed = true
}
"#;

#[test]
fn realistic_file_parses_with_expected_shape() {
    let file = parse_file(SERVER).unwrap();
    assert_eq!(file.package.name, "server");
    assert_eq!(file.imports.len(), 3);
    assert_eq!(file.decls.len(), 6);

    let funcs: Vec<&str> = file.funcs().map(|f| f.name.name.as_str()).collect();
    assert_eq!(funcs, vec!["New", "Dispatch", "Shutdown"]);

    let dispatch = file.funcs().find(|f| f.name.name == "Dispatch").unwrap();
    assert_eq!(dispatch.receiver_type_name(), Some("Server"));
    assert_eq!(dispatch.sig.results.len(), 2);
}

#[test]
fn every_span_indexes_into_the_original_source() {
    let file = parse_file(SERVER).unwrap();
    let len = SERVER.len() as u32;
    inspect(&file, &mut |node, parents| {
        let span = node.span();
        assert!(span.start <= span.end, "inverted span");
        assert!(span.end <= len, "span out of bounds");
        // Child spans stay inside their parent's span.
        if let Some(parent) = parents.last() {
            let pspan = parent.span();
            assert!(
                pspan.start <= span.start && span.end <= pspan.end,
                "child {:?} escapes parent {:?}",
                span,
                pspan
            );
        }
    });
}

#[test]
fn doc_comments_attach_through_the_file() {
    let file = parse_file(SERVER).unwrap();
    match &file.decls[0] {
        Decl::Gen(g) => {
            assert_eq!(g.doc.as_deref(), Some("ErrClosed is returned after Shutdown."));
        }
        other => panic!("expected var decl, got {:?}", other),
    }
    match &file.decls[1] {
        Decl::Gen(g) => match &g.specs[0] {
            Spec::Type(t) => {
                assert_eq!(t.name.name, "Handler");
                assert!(g.doc.as_deref().unwrap().starts_with("Handler responds"));
            }
            other => panic!("expected type spec, got {:?}", other),
        },
        other => panic!("expected type decl, got {:?}", other),
    }
}

#[test]
fn identifier_text_matches_source_slices() {
    let file = parse_file(SERVER).unwrap();
    inspect(&file, &mut |node, _| {
        if let Node::Ident(id) = node {
            let slice = &SERVER[id.span.start as usize..id.span.end as usize];
            assert_eq!(slice, id.name);
        }
    });
}

#[test]
fn guard_return_shape_is_visible_to_consumers() {
    let file = parse_file(SERVER).unwrap();
    let dispatch = file.funcs().find(|f| f.name.name == "Dispatch").unwrap();
    let body = dispatch.body.as_ref().unwrap();
    match &body.stmts[0] {
        Stmt::If(ifs) => {
            assert!(ifs.init.is_none());
            assert!(matches!(
                &ifs.cond,
                Expr::Selector { sel, .. } if sel.name == "closed"
            ));
            assert!(ifs.els.is_none());
        }
        other => panic!("expected guard if, got {:?}", other),
    }
}
