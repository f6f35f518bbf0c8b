//! Template parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::{self, Token};

/// Parse template source into a body of elements
pub fn parse_template(input: &str) -> Result<Body, Vec<ParseError>> {
    let len = input.len();
    let tokens = lexer::lex(input).map_err(|e| vec![ParseError::from(e)])?;

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    template_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
pub(super) fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn template_parser<'a, I>() -> impl Parser<'a, I, Body, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let body = recursive(|body| {
        let identifier = select! {
            Token::Ident(s) => Identifier::new(s),
        };

        let expr = recursive(|expr| {
            let args = expr
                .clone()
                .separated_by(just(Token::Comma))
                .collect::<Vec<_>>()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

            // {x, y | ...} or {...}
            let subtemplate = identifier
                .clone()
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>()
                .then_ignore(just(Token::Pipe))
                .or_not()
                .then(body.clone())
                .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
                .map(|(params, body)| SubTemplate {
                    params: params.unwrap_or_default(),
                    body,
                });

            let include = identifier
                .clone()
                .then(args.clone())
                .map(|(name, args)| Expr::Include { name, args });

            let list = expr
                .clone()
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Expr::List);

            // Note: include must come before a bare attribute, both start with an identifier
            let primary = choice((
                select! { Token::String(s) => Expr::Str(s) },
                just(Token::True).to(Expr::Bool(true)),
                just(Token::False).to(Expr::Bool(false)),
                include,
                identifier.clone().map(Expr::Attribute),
                subtemplate.clone().map(Expr::SubTemplate),
                list,
                expr.clone()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                    .map(|e: Spanned<Expr>| e.node),
            ))
            .map_with(|node, e| Spanned::new(node, span_range(&e.span())));

            let property_name = choice((
                identifier.clone().map(PropertyName::Named),
                expr.clone()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                    .map(|e| PropertyName::Indirect(Box::new(e))),
            ));

            let member = primary
                .then(
                    just(Token::Dot)
                        .ignore_then(property_name)
                        .map_with(|name, e| (name, span_range(&e.span())))
                        .repeated()
                        .collect::<Vec<_>>(),
                )
                .map(|(first, rest)| {
                    rest.into_iter().fold(first, |target, (name, span)| {
                        let span = target.span.start..span.end;
                        Spanned::new(
                            Expr::Property {
                                target: Box::new(target),
                                name,
                            },
                            span,
                        )
                    })
                });

            let template_ref = choice((
                identifier
                    .clone()
                    .then(args)
                    .map(|(name, args)| TemplateRef::Named { name, args }),
                subtemplate.map(TemplateRef::Anonymous),
            ))
            .map_with(|node, e| Spanned::new(node, span_range(&e.span())));

            member
                .then(
                    just(Token::Colon)
                        .ignore_then(template_ref)
                        .repeated()
                        .collect::<Vec<_>>(),
                )
                .map(|(target, templates)| {
                    if templates.is_empty() {
                        return target;
                    }
                    let end = templates.last().map_or(target.span.end, |t| t.span.end);
                    let span = target.span.start..end;
                    Spanned::new(
                        Expr::Map {
                            target: Box::new(target),
                            templates,
                        },
                        span,
                    )
                })
                .boxed()
        });

        // Conditions: ! binds tightest, then &&, then ||
        let condition = recursive(|cond| {
            let atom = choice((
                cond.clone()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
                expr.clone().map(Condition::Expr),
            ));

            let unary = just(Token::Bang)
                .repeated()
                .collect::<Vec<_>>()
                .then(atom)
                .map(|(bangs, c)| bangs.iter().fold(c, |c, _| Condition::Not(Box::new(c))));

            let and = unary
                .clone()
                .then(
                    just(Token::And)
                        .ignore_then(unary)
                        .repeated()
                        .collect::<Vec<_>>(),
                )
                .map(|(first, rest)| {
                    rest.into_iter()
                        .fold(first, |l, r| Condition::And(Box::new(l), Box::new(r)))
                });

            and.clone()
                .then(
                    just(Token::Or)
                        .ignore_then(and)
                        .repeated()
                        .collect::<Vec<_>>(),
                )
                .map(|(first, rest)| {
                    rest.into_iter()
                        .fold(first, |l, r| Condition::Or(Box::new(l), Box::new(r)))
                })
                .boxed()
        });

        let paren_condition =
            condition.delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let option = identifier
            .clone()
            .then_ignore(just(Token::Equals))
            .then(expr.clone())
            .try_map(|(name, value), span| match name.as_str() {
                "separator" => Ok(ExprOption::Separator(value)),
                "null" => Ok(ExprOption::Null(value)),
                "format" => Ok(ExprOption::Format(value)),
                other => Err(Rich::custom(span, format!("unknown option '{}'", other))),
            })
            .map_with(|opt, e| Spanned::new(opt, span_range(&e.span())));

        let expr_element = expr
            .clone()
            .then(
                just(Token::Semi)
                    .ignore_then(
                        option
                            .separated_by(just(Token::Comma))
                            .at_least(1)
                            .collect::<Vec<_>>(),
                    )
                    .or_not(),
            )
            .delimited_by(just(Token::LDelim), just(Token::RDelim))
            .map(|(expr, options)| {
                Element::Expr(ExprElement {
                    expr,
                    options: options.unwrap_or_default(),
                })
            });

        let if_head = just(Token::LDelim)
            .ignore_then(just(Token::If))
            .ignore_then(paren_condition.clone())
            .then_ignore(just(Token::RDelim));
        let elseif_head = just(Token::LDelim)
            .ignore_then(just(Token::ElseIf))
            .ignore_then(paren_condition)
            .then_ignore(just(Token::RDelim));
        let else_tag = just(Token::LDelim)
            .then(just(Token::Else))
            .then(just(Token::RDelim));
        let endif_tag = just(Token::LDelim)
            .then(just(Token::EndIf))
            .then(just(Token::RDelim));

        let if_block = if_head
            .then(body.clone())
            .then(elseif_head.then(body.clone()).repeated().collect::<Vec<_>>())
            .then(else_tag.ignore_then(body.clone()).or_not())
            .then_ignore(endif_tag)
            .map(|(((cond, first), elseifs), otherwise)| {
                let mut branches = vec![(cond, first)];
                branches.extend(elseifs);
                Element::If(IfBlock {
                    branches,
                    otherwise,
                })
            });

        let text = select! {
            Token::Text(s) => Element::Text(s),
        };

        // Note: if_block before expr_element, both start with '<'
        choice((text, if_block, expr_element))
            .map_with(|node, e| Spanned::new(node, span_range(&e.span())))
            .boxed()
            .repeated()
            .collect::<Body>()
    });

    body.then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_one(src: &str) -> Element {
        let body = parse_template(src).expect("Should parse");
        assert_eq!(body.len(), 1, "expected a single element in {:?}", body);
        body.into_iter().next().unwrap().node
    }

    #[test]
    fn test_parse_text_and_attribute() {
        let body = parse_template("Hello, <name>!").expect("Should parse");
        assert_eq!(body.len(), 3);
        assert_eq!(body[0].node, Element::Text("Hello, ".to_string()));
        match &body[1].node {
            Element::Expr(e) => {
                assert_eq!(e.expr.node, Expr::Attribute(Identifier::new("name")));
                assert!(e.options.is_empty());
            }
            other => panic!("Expected expression, got {:?}", other),
        }
        assert_eq!(body[1].span, 7..13);
    }

    #[test]
    fn test_parse_property_chain() {
        match parse_one("<a.b.c>") {
            Element::Expr(e) => match e.expr.node {
                Expr::Property { target, name } => {
                    assert_eq!(name, PropertyName::Named(Identifier::new("c")));
                    assert!(matches!(target.node, Expr::Property { .. }));
                }
                other => panic!("Expected property, got {:?}", other),
            },
            other => panic!("Expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_options() {
        match parse_one(r#"<names; separator=", ", null="n/a", format="short">"#) {
            Element::Expr(e) => {
                assert_eq!(e.options.len(), 3);
                assert!(matches!(e.options[0].node, ExprOption::Separator(_)));
                assert!(matches!(e.options[1].node, ExprOption::Null(_)));
                assert!(matches!(e.options[2].node, ExprOption::Format(_)));
            }
            other => panic!("Expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_option_fails() {
        assert!(parse_template(r#"<names; wrap="\n">"#).is_err());
    }

    #[test]
    fn test_parse_include() {
        match parse_one("<row(a, b.c)>") {
            Element::Expr(e) => match e.expr.node {
                Expr::Include { name, args } => {
                    assert_eq!(name.as_str(), "row");
                    assert_eq!(args.len(), 2);
                }
                other => panic!("Expected include, got {:?}", other),
            },
            other => panic!("Expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_map_with_subtemplate() {
        match parse_one("<items:{x | <x.name>}; separator=\",\">") {
            Element::Expr(e) => match e.expr.node {
                Expr::Map { templates, .. } => {
                    assert_eq!(templates.len(), 1);
                    match &templates[0].node {
                        TemplateRef::Anonymous(sub) => {
                            assert_eq!(sub.params, vec![Identifier::new("x")]);
                            assert_eq!(sub.body.len(), 1);
                        }
                        other => panic!("Expected sub-template, got {:?}", other),
                    }
                }
                other => panic!("Expected map, got {:?}", other),
            },
            other => panic!("Expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_chained_map() {
        match parse_one("<items:bold():italic()>") {
            Element::Expr(e) => match e.expr.node {
                Expr::Map { templates, .. } => assert_eq!(templates.len(), 2),
                other => panic!("Expected map, got {:?}", other),
            },
            other => panic!("Expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_elseif_else() {
        match parse_one("<if(a)>A<elseif(!b && c)>B<else>C<endif>") {
            Element::If(block) => {
                assert_eq!(block.branches.len(), 2);
                assert!(matches!(block.branches[1].0, Condition::And(_, _)));
                assert_eq!(
                    block.otherwise,
                    Some(vec![Spanned::new(Element::Text("C".to_string()), 32..33)])
                );
            }
            other => panic!("Expected if block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_if() {
        match parse_one("<if(a)><if(b)>x<endif><endif>") {
            Element::If(block) => {
                assert!(matches!(block.branches[0].1[0].node, Element::If(_)));
            }
            other => panic!("Expected if block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_endif_fails() {
        assert!(parse_template("<if(a)>x").is_err());
    }

    #[test]
    fn test_lex_error_is_reported() {
        let errors = parse_template("Hello, <name").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ParseError::Lexical { span, .. } if *span == (7..8)
        ));
    }

    #[test]
    fn test_referenced_attributes() {
        let body =
            parse_template("<if(show)><items:{x | <x><sep>}><endif><it><owner.name>").unwrap();
        assert_eq!(referenced_attributes(&body), vec!["show", "items", "sep", "owner"]);
    }
}
